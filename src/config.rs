//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `bonestat.toml` files. Every field has a default, so a partial file only
//! needs the sections it changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "bonestat.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input and output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// How the group column maps to case and control arms.
    #[serde(default)]
    pub groups: GroupsConfig,

    /// Analysis variables and model settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Cohort derivation from the raw export.
    #[serde(default)]
    pub setup: SetupConfig,

    /// Literature search and bibliography audit.
    #[serde(default)]
    pub litreview: LitReviewConfig,

    /// Manuscript text audit.
    #[serde(default)]
    pub manuscript: ManuscriptConfig,

    /// Final cohort files, in processing order.
    #[serde(default = "default_cohorts")]
    pub cohorts: Vec<CohortEntry>,

    /// Manuscript comparison tables.
    #[serde(default = "default_tables")]
    pub tables: Vec<TableSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            paths: PathsConfig::default(),
            groups: GroupsConfig::default(),
            analysis: AnalysisConfig::default(),
            setup: SetupConfig::default(),
            litreview: LitReviewConfig::default(),
            manuscript: ManuscriptConfig::default(),
            cohorts: default_cohorts(),
            tables: default_tables(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Input and output locations. Relative paths resolve against the
/// working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Raw clinical export used by `setup`.
    #[serde(default = "default_raw_file")]
    pub raw_file: PathBuf,

    /// Master database used by `setup --risk`.
    #[serde(default = "default_master_file")]
    pub master_file: PathBuf,

    /// Directory holding the final cohort files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory for risk-factor sub-cohorts.
    #[serde(default = "default_risk_dir")]
    pub risk_dir: PathBuf,

    /// Directory for generated tables.
    #[serde(default = "default_tables_dir")]
    pub tables_dir: PathBuf,

    /// Directory for generated figures.
    #[serde(default = "default_figures_dir")]
    pub figures_dir: PathBuf,

    /// Directory for literature review outputs.
    #[serde(default = "default_litreview_dir")]
    pub litreview_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_file: default_raw_file(),
            master_file: default_master_file(),
            data_dir: default_data_dir(),
            risk_dir: default_risk_dir(),
            tables_dir: default_tables_dir(),
            figures_dir: default_figures_dir(),
            litreview_dir: default_litreview_dir(),
        }
    }
}

fn default_raw_file() -> PathBuf {
    PathBuf::from("data/01_raw/DBT_final.csv")
}

fn default_master_file() -> PathBuf {
    PathBuf::from("data/01_raw/master_database.csv")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/03_final")
}

fn default_risk_dir() -> PathBuf {
    PathBuf::from("data/04_risk_factors")
}

fn default_tables_dir() -> PathBuf {
    PathBuf::from("results/tables")
}

fn default_figures_dir() -> PathBuf {
    PathBuf::from("results/figures")
}

fn default_litreview_dir() -> PathBuf {
    PathBuf::from("results/litreview")
}

/// Group column settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupsConfig {
    /// Column holding the group label.
    #[serde(default = "default_group_column")]
    pub column: String,

    /// Labels identifying cases (fracture).
    #[serde(default = "default_case_labels")]
    pub case_labels: Vec<String>,

    /// Labels identifying controls.
    #[serde(default = "default_control_labels")]
    pub control_labels: Vec<String>,

    /// Display name for cases.
    #[serde(default = "default_case_name")]
    pub case_name: String,

    /// Display name for controls.
    #[serde(default = "default_control_name")]
    pub control_name: String,

    /// Match a label when it contains a configured label instead of
    /// requiring equality.
    #[serde(default)]
    pub substring_match: bool,
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            column: default_group_column(),
            case_labels: default_case_labels(),
            control_labels: default_control_labels(),
            case_name: default_case_name(),
            control_name: default_control_name(),
            substring_match: false,
        }
    }
}

fn default_group_column() -> String {
    "GROUP".to_string()
}

fn default_case_labels() -> Vec<String> {
    vec!["Group A".to_string()]
}

fn default_control_labels() -> Vec<String> {
    vec!["Group B".to_string()]
}

fn default_case_name() -> String {
    "Fracture".to_string()
}

fn default_control_name() -> String {
    "Control".to_string()
}

/// A named cohort file under `paths.data_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortEntry {
    pub name: String,
    pub file: String,
}

fn cohort(name: &str, file: &str) -> CohortEntry {
    CohortEntry {
        name: name.to_string(),
        file: file.to_string(),
    }
}

fn default_cohorts() -> Vec<CohortEntry> {
    vec![
        cohort("total_n215", "cohort_total_n215.csv"),
        cohort("total_diabetes", "cohort_total_diabetes.csv"),
        cohort("osteopenia_n91", "cohort_osteopenia_n91.csv"),
        cohort("osteopenia_diabetes", "cohort_osteopenia_diabetes.csv"),
    ]
}

/// A column with its display label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub column: String,
    pub label: String,
}

fn var(column: &str, label: &str) -> VariableSpec {
    VariableSpec {
        column: column.to_string(),
        label: label.to_string(),
    }
}

/// A manuscript comparison table: variables compared between arms in one cohort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    /// Output file stem.
    pub stem: String,
    pub title: String,
    pub cohort: String,
    pub variables: Vec<VariableSpec>,
}

fn default_tables() -> Vec<TableSpec> {
    vec![
        TableSpec {
            stem: "Table1_Clinical".to_string(),
            title: "Table 1: Clinical Characteristics (Osteopenia Sub-cohort)".to_string(),
            cohort: "osteopenia_n91".to_string(),
            variables: vec![
                var("AGE", "Age (years)"),
                var("BMI", "BMI (kg/m²)"),
                var("L1-L4 T SCORE", "L1-L4 T-score"),
                var("NECK_TSCORE", "Femoral Neck T-score"),
                var("TBS", "Trabecular Bone Score (TBS)"),
            ],
        },
        TableSpec {
            stem: "Table2_Structural".to_string(),
            title: "Table 2: HR-pQCT & Biomechanics (Osteopenia Sub-cohort)".to_string(),
            cohort: "osteopenia_n91".to_string(),
            variables: vec![
                var("RADIUS_ttvBMD", "Radius Total vBMD"),
                var("RADIUS_TB.N", "Radius Tb.N (1/mm)"),
                var("RADIUS_TB.SP", "Radius Tb.Sp (mm)"),
                var("RADIUS_CT.PO", "Radius Ct.Po (1)"),
                var("F.Load", "Failure Load (N)"),
            ],
        },
        TableSpec {
            stem: "Table3_Validation".to_string(),
            title: "Table 3: Validation in General Cohort".to_string(),
            cohort: "total_n215".to_string(),
            variables: vec![
                var("RADIUS_TB.N", "Radius Tb.N (Validation)"),
                var("RADIUS_CT.PO", "Radius Ct.Po (Validation)"),
            ],
        },
        TableSpec {
            stem: "Table4_Diabetes".to_string(),
            title: "Table 4: Diabetic Osteopenia Phenotype".to_string(),
            cohort: "osteopenia_diabetes".to_string(),
            variables: vec![
                var("RADIUS_CT.PO", "Cortical Porosity (Ct.Po)"),
                var("RADIUS_TB.N", "Trabecular Number (Tb.N)"),
            ],
        },
    ]
}

/// A measurement site and the prefix used in its column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSpec {
    pub name: String,
    pub prefix: String,
}

/// A parameter measured at both sites, for the forest plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedParameter {
    pub label: String,
    pub radius: String,
    pub tibia: String,
}

/// Analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Variables in the per-cohort comparison table.
    #[serde(default = "default_variables")]
    pub variables: Vec<String>,

    /// Bone parameters entered into the adjusted odds ratio models.
    #[serde(default = "default_or_parameters")]
    pub or_parameters: Vec<String>,

    /// Covariates for the adjusted odds ratio models.
    #[serde(default = "default_covariates")]
    pub covariates: Vec<String>,

    /// Covariates for the baseline odds ratios.
    #[serde(default = "default_baseline_covariates")]
    pub baseline_covariates: Vec<String>,

    /// FRAX column used as the single adjuster in `odds --frax`.
    #[serde(default = "default_frax_column")]
    pub frax_column: String,

    /// Parameters whose risk rises with the value (per SD increase).
    #[serde(default = "default_increase_markers")]
    pub increase_markers: Vec<String>,

    /// Parameters analysed as absolute values (FEA outputs are often negative).
    #[serde(default = "default_absolute_markers")]
    pub absolute_markers: Vec<String>,

    /// Categorical variables for the baseline tests.
    #[serde(default = "default_categorical")]
    pub categorical: Vec<String>,

    /// Continuous variables for the baseline tests.
    #[serde(default = "default_continuous")]
    pub continuous: Vec<String>,

    /// Variables for the fracture and baseline summary.
    #[serde(default = "default_baseline_variables")]
    pub baseline_variables: Vec<String>,

    /// Column holding the fracture site description.
    #[serde(default = "default_fracture_site_column")]
    pub fracture_site_column: String,

    /// Column holding diabetes status (Y/N).
    #[serde(default = "default_diabetes_column")]
    pub diabetes_column: String,

    /// Categorical risk factors screened against bone outcomes.
    #[serde(default = "default_risk_factors")]
    pub risk_factors: Vec<String>,

    /// Bone outcomes for the risk-factor screen.
    #[serde(default = "default_risk_outcomes")]
    pub risk_outcomes: Vec<String>,

    /// Minimum "Y" rows before a risk factor is screened.
    #[serde(default = "default_risk_min_group")]
    pub risk_min_group: usize,

    /// Minimum values per arm before a variable is compared.
    #[serde(default = "default_min_group_size")]
    pub min_group_size: usize,

    /// Predictors of the clinical ROC model.
    #[serde(default = "default_clinical_model")]
    pub clinical_model: Vec<String>,

    /// Predictors of the structural ROC model.
    #[serde(default = "default_structural_model")]
    pub structural_model: Vec<String>,

    /// Reference line drawn on T-score box plots.
    #[serde(default = "default_t_score_threshold")]
    pub t_score_threshold: f64,

    /// DXA T-score columns plotted by subgroup.
    #[serde(default = "default_dxa_columns")]
    pub dxa_columns: Vec<VariableSpec>,

    /// Column of the diabetic porosity box plot.
    #[serde(default = "default_porosity_column")]
    pub porosity_column: String,

    /// Maximum Newton iterations for logistic fits.
    #[serde(default = "default_logit_max_iter")]
    pub logit_max_iter: usize,

    /// Convergence tolerance for logistic fits.
    #[serde(default = "default_logit_tol")]
    pub logit_tol: f64,

    /// Sites for the subgroup table.
    #[serde(default = "default_sites")]
    pub sites: Vec<SiteSpec>,

    /// Subgroup table parameters. `{}` is replaced by the site prefix.
    #[serde(default = "default_subgroup_parameters")]
    pub subgroup_parameters: Vec<VariableSpec>,

    /// Forest plot parameters.
    #[serde(default = "default_forest_parameters")]
    pub forest_parameters: Vec<PairedParameter>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            variables: default_variables(),
            or_parameters: default_or_parameters(),
            covariates: default_covariates(),
            baseline_covariates: default_baseline_covariates(),
            frax_column: default_frax_column(),
            increase_markers: default_increase_markers(),
            absolute_markers: default_absolute_markers(),
            categorical: default_categorical(),
            continuous: default_continuous(),
            baseline_variables: default_baseline_variables(),
            fracture_site_column: default_fracture_site_column(),
            diabetes_column: default_diabetes_column(),
            risk_factors: default_risk_factors(),
            risk_outcomes: default_risk_outcomes(),
            risk_min_group: default_risk_min_group(),
            min_group_size: default_min_group_size(),
            sites: default_sites(),
            subgroup_parameters: default_subgroup_parameters(),
            forest_parameters: default_forest_parameters(),
            clinical_model: default_clinical_model(),
            structural_model: default_structural_model(),
            t_score_threshold: default_t_score_threshold(),
            dxa_columns: default_dxa_columns(),
            porosity_column: default_porosity_column(),
            logit_max_iter: default_logit_max_iter(),
            logit_tol: default_logit_tol(),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn default_variables() -> Vec<String> {
    strings(&[
        "AGE",
        "BMI",
        "L1-L4 T SCORE",
        "NECK_TSCORE",
        "HT_TSCORE",
        "TBS",
        "FRAX – Major Osteoporotic Fracture (%)",
        "FRAX – Hip Fracture (%)",
        "RADIUS_ttvBMD",
        "RADIUS_TB.N",
        "RADIUS_CT.PO",
        "RADIUS_CT.TH",
        "TIBIA_ttvBMD",
        "TIBIA_TB.N",
        "TIBIA_CT.PO",
        "TIBIA_CT.TH",
        "F.Load_RADIUS",
        "Stiffness_RADIUS",
        "F.Load_TIBIA",
        "Stiffness_TIBIA",
    ])
}

fn default_or_parameters() -> Vec<String> {
    strings(&[
        "RADIUS_ttvBMD",
        "RADIUS_TB.N",
        "RADIUS_CT.PO",
        "F.Load_RADIUS",
        "TIBIA_ttvBMD",
        "TIBIA_TB.N",
        "TIBIA_CT.PO",
        "F.Load_TIBIA",
    ])
}

fn default_covariates() -> Vec<String> {
    strings(&["AGE", "BMI", "HT_BMD"])
}

fn default_baseline_covariates() -> Vec<String> {
    strings(&["AGE", "BMI"])
}

fn default_frax_column() -> String {
    "FRAX – Major Osteoporotic Fracture (%)".to_string()
}

fn default_increase_markers() -> Vec<String> {
    strings(&["CT.PO"])
}

fn default_absolute_markers() -> Vec<String> {
    strings(&["F.Load", "Stiffness"])
}

fn default_categorical() -> Vec<String> {
    strings(&[
        "CURRENT SMOKING",
        "GLUCOTICOID THERAPY",
        "TYPE 2 DM",
        "RA",
        "SECONDARY OSTEOPOROSIS",
    ])
}

fn default_continuous() -> Vec<String> {
    strings(&[
        "AGE",
        "BMI",
        "L1-L4 T SCORE",
        "NECK_TSCORE",
        "TBS",
        "RADIUS_TB.N",
        "RADIUS_CT.PO",
        "F.Load_RADIUS",
        "TIBIA_TB.N",
        "TIBIA_CT.PO",
        "F.Load_TIBIA",
    ])
}

fn default_baseline_variables() -> Vec<String> {
    strings(&["AGE", "BMI", "L1-L4 T SCORE", "NECK_TSCORE", "TBS"])
}

fn default_fracture_site_column() -> String {
    "SITE OF FRACTURE".to_string()
}

fn default_diabetes_column() -> String {
    "TYPE 2 DM".to_string()
}

fn default_risk_factors() -> Vec<String> {
    strings(&["TYPE 2 DM", "GLUCOTICOID THERAPY", "RA", "CURRENT SMOKING"])
}

fn default_risk_outcomes() -> Vec<String> {
    strings(&[
        "RADIUS_TB.N",
        "RADIUS_CT.PO",
        "F.Load_RADIUS",
        "TIBIA_TB.N",
        "TIBIA_CT.PO",
        "F.Load_TIBIA",
    ])
}

fn default_risk_min_group() -> usize {
    5
}

fn default_min_group_size() -> usize {
    2
}

fn default_sites() -> Vec<SiteSpec> {
    vec![
        SiteSpec {
            name: "Distal Radius".to_string(),
            prefix: "RADIUS".to_string(),
        },
        SiteSpec {
            name: "Distal Tibia".to_string(),
            prefix: "TIBIA".to_string(),
        },
    ]
}

fn default_subgroup_parameters() -> Vec<VariableSpec> {
    vec![
        var("{}_ttvBMD", "Total vBMD (mg HA/cm³)"),
        var("{}_tbvBMD", "Trabecular vBMD (mg HA/cm³)"),
        var("{}_CTvBMD", "Cortical vBMD (mg HA/cm³)"),
        var("{}_TB.N", "Trabecular Number (Tb.N, 1/mm)"),
        var("{}_TB.TH", "Trabecular Thickness (Tb.Th, mm)"),
        var("{}_TB.SP", "Trabecular Separation (Tb.Sp, mm)"),
        var("{}_CT.TH", "Cortical Thickness (Ct.Th, mm)"),
        var("{}_CT.PO", "Cortical Porosity (Ct.Po, %)"),
        var("Stiffness_{}", "Stiffness (kN/mm)"),
        var("F.Load_{}", "Failure Load (F.Load, kN)"),
    ]
}

fn paired(label: &str, radius: &str, tibia: &str) -> PairedParameter {
    PairedParameter {
        label: label.to_string(),
        radius: radius.to_string(),
        tibia: tibia.to_string(),
    }
}

fn default_forest_parameters() -> Vec<PairedParameter> {
    vec![
        paired("Total vBMD", "RADIUS_ttvBMD", "TIBIA_ttvBMD"),
        paired("Tb.vBMD", "RADIUS_tbvBMD", "TIBIA_tbvBMD"),
        paired("Ct.Th", "RADIUS_CT.TH", "TIBIA_CT.TH"),
        paired("Tb.N", "RADIUS_TB.N", "TIBIA_TB.N"),
        paired("Ct.Po", "RADIUS_CT.PO", "TIBIA_CT.PO"),
        paired("Stiffness", "Stiffness_RADIUS", "Stiffness_TIBIA"),
        paired("Failure Load", "F.Load_RADIUS", "F.Load_TIBIA"),
    ]
}

fn default_clinical_model() -> Vec<String> {
    strings(&["AGE", "BMI", "NECK_TSCORE"])
}

fn default_structural_model() -> Vec<String> {
    strings(&["AGE", "BMI", "RADIUS_TB.N", "RADIUS_ttvBMD"])
}

fn default_t_score_threshold() -> f64 {
    -2.5
}

fn default_dxa_columns() -> Vec<VariableSpec> {
    vec![
        var("L1-L4 T SCORE", "Lumbar Spine (L1-L4)"),
        var("NECK_TSCORE", "Femoral Neck"),
        var("HT_TSCORE", "Total Hip"),
    ]
}

fn default_porosity_column() -> String {
    "RADIUS_CT.PO".to_string()
}

fn default_logit_max_iter() -> usize {
    35
}

fn default_logit_tol() -> f64 {
    1e-8
}

/// One derived cohort written by `setup`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcohortSpec {
    pub name: String,
    pub file: String,

    /// Keep only diabetic rows.
    #[serde(default)]
    pub diabetes: bool,

    /// Keep only rows whose classification contains this text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification_contains: Option<String>,
}

/// Cohort derivation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupConfig {
    /// Columns that must hold a number for a row to be included.
    #[serde(default = "default_inclusion_columns")]
    pub inclusion_columns: Vec<String>,

    /// Normalized group labels admitted to the cohort.
    #[serde(default = "default_included_groups")]
    pub included_groups: Vec<String>,

    /// WHO classification column.
    #[serde(default = "default_classification_column")]
    pub classification_column: String,

    /// Inclusion flag columns for the risk-factor database.
    #[serde(default = "default_risk_inclusion_flags")]
    pub risk_inclusion_flags: Vec<String>,

    /// Diabetes columns checked in the risk-factor database.
    #[serde(default = "default_risk_diabetes_columns")]
    pub risk_diabetes_columns: Vec<String>,

    /// Sub-cohorts written from the included rows.
    #[serde(default = "default_subcohorts")]
    pub subcohorts: Vec<SubcohortSpec>,

    /// Sub-cohorts written by `setup --risk`.
    #[serde(default = "default_risk_subcohorts")]
    pub risk_subcohorts: Vec<SubcohortSpec>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            inclusion_columns: default_inclusion_columns(),
            included_groups: default_included_groups(),
            classification_column: default_classification_column(),
            subcohorts: default_subcohorts(),
            risk_inclusion_flags: default_risk_inclusion_flags(),
            risk_diabetes_columns: default_risk_diabetes_columns(),
            risk_subcohorts: default_risk_subcohorts(),
        }
    }
}

fn default_inclusion_columns() -> Vec<String> {
    strings(&["L1-L4 T SCORE", "RADIUS_ttvBMD"])
}

fn default_included_groups() -> Vec<String> {
    strings(&["Group A", "Group B"])
}

fn default_classification_column() -> String {
    "WHO CLASSIFICATION".to_string()
}

fn subcohort(name: &str, file: &str, diabetes: bool, contains: Option<&str>) -> SubcohortSpec {
    SubcohortSpec {
        name: name.to_string(),
        file: file.to_string(),
        diabetes,
        classification_contains: contains.map(String::from),
    }
}

fn default_subcohorts() -> Vec<SubcohortSpec> {
    vec![
        subcohort("total", "cohort_total_n215.csv", false, None),
        subcohort("total_diabetes", "cohort_total_diabetes.csv", true, None),
        subcohort("osteopenia", "cohort_osteopenia_n91.csv", false, Some("OSTEOPENIA")),
        subcohort(
            "osteopenia_diabetes",
            "cohort_osteopenia_diabetes.csv",
            true,
            Some("OSTEOPENIA"),
        ),
    ]
}

fn default_risk_inclusion_flags() -> Vec<String> {
    strings(&["hrpqct done", "BMD DONE OR NOT"])
}

fn default_risk_diabetes_columns() -> Vec<String> {
    strings(&["DIABETES PRESENT / ABSENT", "TYPE 2 DM"])
}

fn default_risk_subcohorts() -> Vec<SubcohortSpec> {
    vec![
        subcohort("risk_total", "cohort_risk_total.csv", false, None),
        subcohort("risk_osteopenia", "cohort_risk_osteopenia.csv", false, Some("OSTEOPENIA")),
        subcohort("risk_diabetes", "cohort_risk_diabetes.csv", true, None),
        subcohort(
            "risk_osteo_diabetes",
            "cohort_risk_osteo_diabetes.csv",
            true,
            Some("OSTEOPENIA"),
        ),
    ]
}

/// A reference the bibliography must contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredReference {
    /// Fragment of the citation key (usually the first author).
    pub key: String,
    pub year: String,
    /// Fragment of the title, matched case-insensitively.
    pub title_fragment: String,
    /// Why the reference matters to the manuscript.
    pub role: String,
}

/// Literature search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LitReviewConfig {
    /// Search API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Search query.
    #[serde(default = "default_query")]
    pub query: String,

    /// Maximum search results.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Titles fetched first and always kept.
    #[serde(default = "default_anchors")]
    pub anchors: Vec<String>,

    /// Keywords worth 3 points each.
    #[serde(default = "default_high_value_keywords")]
    pub high_value_keywords: Vec<String>,

    /// Keywords worth 1 point each.
    #[serde(default = "default_medium_value_keywords")]
    pub medium_value_keywords: Vec<String>,

    /// Minimum score for a paper to be kept.
    #[serde(default = "default_min_score")]
    pub min_score: i64,

    /// Citation count above which a paper earns a bonus point.
    #[serde(default = "default_citation_threshold")]
    pub citation_threshold: u64,

    /// References the final bibliography must contain.
    #[serde(default = "default_required_references")]
    pub required: Vec<RequiredReference>,
}

impl Default for LitReviewConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            query: default_query(),
            limit: default_limit(),
            timeout_seconds: default_timeout(),
            anchors: default_anchors(),
            high_value_keywords: default_high_value_keywords(),
            medium_value_keywords: default_medium_value_keywords(),
            min_score: default_min_score(),
            citation_threshold: default_citation_threshold(),
            required: default_required_references(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.semanticscholar.org/graph/v1".to_string()
}

fn default_query() -> String {
    "HR-pQCT osteopenia fracture discrimination".to_string()
}

fn default_limit() -> usize {
    100
}

fn default_timeout() -> u64 {
    30
}

fn default_anchors() -> Vec<String> {
    strings(&[
        "Bone microarchitecture assessed by HR-pQCT as predictor of fracture risk in postmenopausal women: the OFELY study",
        "Cortical porosity in older men with type 2 diabetes",
    ])
}

fn default_high_value_keywords() -> Vec<String> {
    strings(&[
        "osteopenia",
        "t-score",
        "diabetes",
        "cortical porosity",
        "grey zone",
    ])
}

fn default_medium_value_keywords() -> Vec<String> {
    strings(&[
        "hr-pqct",
        "microarchitecture",
        "fracture discrimination",
        "trabecular",
        "vbm",
        "auc",
    ])
}

fn default_min_score() -> i64 {
    3
}

fn default_citation_threshold() -> u64 {
    50
}

fn default_required_references() -> Vec<RequiredReference> {
    vec![
        RequiredReference {
            key: "sornay-rendu".to_string(),
            year: "2017".to_string(),
            title_fragment: "ofely study".to_string(),
            role: "Gold standard fracture prediction in postmenopausal women".to_string(),
        },
        RequiredReference {
            key: "patsch".to_string(),
            year: "2013".to_string(),
            title_fragment: "cortical porosity".to_string(),
            role: "Diabetic cortical porosity phenotype".to_string(),
        },
    ]
}

/// Manuscript text audit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManuscriptConfig {
    /// Words that read as generated filler.
    #[serde(default = "default_filler_words")]
    pub filler_words: Vec<String>,

    /// Phrases that overstate findings.
    #[serde(default = "default_risky_phrases")]
    pub risky_phrases: Vec<String>,

    /// Acceptable Flesch reading ease band.
    #[serde(default = "default_readability_min")]
    pub readability_min: f64,

    #[serde(default = "default_readability_max")]
    pub readability_max: f64,

    /// Maximum share of passive sentences, in percent.
    #[serde(default = "default_passive_threshold")]
    pub passive_threshold: f64,

    /// Manuscript title for assembled front matter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Bibliography file referenced from assembled front matter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bibliography: Option<String>,
}

impl Default for ManuscriptConfig {
    fn default() -> Self {
        Self {
            filler_words: default_filler_words(),
            risky_phrases: default_risky_phrases(),
            readability_min: default_readability_min(),
            readability_max: default_readability_max(),
            passive_threshold: default_passive_threshold(),
            title: None,
            bibliography: None,
        }
    }
}

fn default_filler_words() -> Vec<String> {
    strings(&[
        "delve",
        "testament",
        "leverage",
        "underscores",
        "pivotal",
        "comprehensive",
        "landscape",
        "realm",
        "tapestry",
        "notably",
        "crucial",
        "fostering",
        "harnessing",
    ])
}

fn default_risky_phrases() -> Vec<String> {
    strings(&[
        "it is well known",
        "prove",
        "proves",
        "clearly demonstrates",
        "undoubtedly",
        "for the first time",
    ])
}

fn default_readability_min() -> f64 {
    20.0
}

fn default_readability_max() -> f64 {
    60.0
}

fn default_passive_threshold() -> f64 {
    30.0
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.data_dir {
            self.paths.data_dir = dir.clone();
        }
        if let Some(ref dir) = args.tables_dir {
            self.paths.tables_dir = dir.clone();
        }
        if let Some(ref dir) = args.figures_dir {
            self.paths.figures_dir = dir.clone();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Look up a configured cohort by name.
    pub fn cohort(&self, name: &str) -> Option<&CohortEntry> {
        self.cohorts.iter().find(|c| c.name == name)
    }

    /// Path of a configured cohort file.
    pub fn cohort_path(&self, entry: &CohortEntry) -> PathBuf {
        self.paths.data_dir.join(&entry.file)
    }

    /// Resolve the input of a single-cohort command.
    ///
    /// An explicit file wins, then a named cohort, then the first configured
    /// cohort. Returns the display name with the path.
    pub fn resolve_input(
        &self,
        input: Option<&Path>,
        cohort: Option<&str>,
    ) -> Result<(String, PathBuf)> {
        if let Some(path) = input {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "input".to_string());
            return Ok((name, path.to_path_buf()));
        }

        let entry = match cohort {
            Some(name) => self
                .cohort(name)
                .with_context(|| format!("Unknown cohort '{}'", name))?,
            None => self
                .cohorts
                .first()
                .context("No cohorts configured and no --input given")?,
        };

        Ok((entry.name.clone(), self.cohort_path(entry)))
    }

    /// Whether values of `column` are analysed as absolute values.
    pub fn is_absolute(&self, column: &str) -> bool {
        let upper = column.to_uppercase();
        self.analysis
            .absolute_markers
            .iter()
            .any(|m| upper.contains(&m.to_uppercase()))
    }

    /// Direction of the standardized predictor: +1 per SD increase for
    /// increase markers, -1 per SD decrease otherwise.
    pub fn direction(&self, column: &str) -> f64 {
        let upper = column.to_uppercase();
        if self
            .analysis
            .increase_markers
            .iter()
            .any(|m| upper.contains(&m.to_uppercase()))
        {
            1.0
        } else {
            -1.0
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.groups.column, "GROUP");
        assert_eq!(config.cohorts.len(), 4);
        assert_eq!(config.analysis.covariates, vec!["AGE", "BMI", "HT_BMD"]);
        assert_eq!(config.paths.data_dir, PathBuf::from("data/03_final"));
        assert_eq!(config.tables.len(), 4);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[paths]
data_dir = "cohorts"

[groups]
case_labels = ["A"]
control_labels = ["B"]
substring_match = true

[analysis]
covariates = ["AGE"]
min_group_size = 3

[[cohorts]]
name = "pilot"
file = "pilot.csv"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.paths.data_dir, PathBuf::from("cohorts"));
        assert_eq!(config.paths.tables_dir, PathBuf::from("results/tables"));
        assert!(config.groups.substring_match);
        assert_eq!(config.groups.case_name, "Fracture");
        assert_eq!(config.analysis.covariates, vec!["AGE"]);
        assert_eq!(config.analysis.min_group_size, 3);
        assert_eq!(config.analysis.frax_column, default_frax_column());
        assert_eq!(config.cohorts, vec![cohort("pilot", "pilot.csv")]);
        assert_eq!(config.litreview.min_score, 3);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[paths]"));
        assert!(toml_str.contains("[[cohorts]]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.cohorts, Config::default().cohorts);
    }

    #[test]
    fn test_resolve_input() {
        let config = Config::default();

        let (name, path) = config.resolve_input(None, None).unwrap();
        assert_eq!(name, "total_n215");
        assert_eq!(path, PathBuf::from("data/03_final/cohort_total_n215.csv"));

        let (name, _) = config.resolve_input(None, Some("osteopenia_n91")).unwrap();
        assert_eq!(name, "osteopenia_n91");

        let (name, path) = config
            .resolve_input(Some(Path::new("other/pilot.csv")), Some("ignored"))
            .unwrap();
        assert_eq!(name, "pilot");
        assert_eq!(path, PathBuf::from("other/pilot.csv"));

        assert!(config.resolve_input(None, Some("missing")).is_err());
    }

    #[test]
    fn test_direction_and_absolute_markers() {
        let config = Config::default();
        assert_eq!(config.direction("RADIUS_CT.PO"), 1.0);
        assert_eq!(config.direction("Radius_Ct.Po"), 1.0);
        assert_eq!(config.direction("RADIUS_TB.N"), -1.0);
        assert!(config.is_absolute("F.Load_RADIUS"));
        assert!(config.is_absolute("Stiffness_TIBIA"));
        assert!(config.is_absolute("STIFFNESS_TIBIA"));
        assert!(config.is_absolute("f.load_radius"));
        assert!(!config.is_absolute("RADIUS_TB.N"));
    }
}
