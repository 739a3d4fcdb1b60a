//! bonestat - cohort statistics for bone densitometry studies
//!
//! A CLI tool that derives study cohorts from a raw clinical export and
//! produces the comparison tables, odds ratios and figures of an HR-pQCT
//! fracture study, plus literature and manuscript checks.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing file, bad config, failed search, etc.)
//!   2 - Required references missing with --strict

mod analysis;
mod cli;
mod cohort;
mod config;
mod litreview;
mod manuscript;
mod models;
mod report;
mod stats;

use analysis::compare::unlabelled;
use analysis::fractures::{fracture_table, FRACTURE_STEM};
use analysis::odds::OddsMode;
use analysis::risk_factors::{risk_table, screen_risk_factors};
use analysis::subgroups::{box_groups, subgroup_table, SUBGROUP_STEM};
use anyhow::{Context, Result};
use cli::{Args, CohortArgs, Command, OutputFormat, PlotKind};
use cohort::{CohortTable, Subgroup};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::{ReportMetadata, ResultTable};
use report::figures::{box_plot, forest_plot, roc_figure, RocSeries};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, Registry};

type LogHandle = reload::Handle<LevelFilter, Registry>;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if let Command::InitConfig = args.command {
        return handle_init_config();
    }

    // Initialize logging
    let log = init_logging(&args);

    info!("bonestat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_command(args, log).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default bonestat.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set paths, cohorts, variables and covariates.");
    Ok(())
}

/// Initialize logging based on verbosity settings. The returned handle
/// lets the config file raise the level once it is loaded.
fn init_logging(args: &Args) -> Option<LogHandle> {
    let (filter, handle) = reload::Layer::new(LevelFilter::from_level(args.log_level()));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact(),
    );

    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => Some(handle),
        Err(e) => {
            eprintln!("Failed to set tracing subscriber: {}", e);
            None
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Dispatch a subcommand. Returns the exit code.
async fn run_command(args: Args, log: Option<LogHandle>) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    let level = args.effective_log_level(config.general.verbose);
    if let Some(handle) = log.filter(|_| level != args.log_level()) {
        if let Err(e) = handle.modify(|filter| *filter = LevelFilter::from_level(level)) {
            warn!("Failed to apply configured log level: {}", e);
        }
    }
    let out = Output {
        config: &config,
        formats: &args.format,
    };

    let code = match &args.command {
        Command::InitConfig => 0,
        Command::Setup { risk, input } => cmd_setup(&config, *risk, input.as_deref())?,
        Command::Compare { cohort, tables } => cmd_compare(&out, cohort, *tables)?,
        Command::Odds {
            cohort,
            frax,
            quartile,
        } => {
            let mode = if *frax {
                OddsMode::Frax
            } else if *quartile {
                OddsMode::Quartile
            } else {
                OddsMode::PerSd
            };
            cmd_odds(&out, cohort, mode)?
        }
        Command::Baseline { cohort } => cmd_baseline(&out, cohort)?,
        Command::Subgroups { cohort } => cmd_subgroups(&out, cohort)?,
        Command::RiskFactors { cohort } => cmd_risk_factors(&out, cohort)?,
        Command::Fractures { cohorts } => cmd_fractures(&out, cohorts)?,
        Command::Describe { input, columns } => {
            let (name, table) = load_file(input)?;
            let result = analysis::explore::describe(&table, columns)?;
            out.save(result, &format!("descriptive_{}", name), &name, table.len())?;
            0
        }
        Command::Correlate { input, columns } => {
            let (name, table) = load_file(input)?;
            let (matrix, pairs) = analysis::explore::correlate(&table, columns)?;
            out.save(matrix, &format!("correlation_matrix_{}", name), &name, table.len())?;
            out.save(pairs, &format!("correlation_pairs_{}", name), &name, table.len())?;
            0
        }
        Command::Regress {
            input,
            outcome,
            predictors,
        } => {
            let (name, table) = load_file(input)?;
            let result = analysis::explore::regress(&table, outcome, predictors)?;
            out.save(result, &format!("regression_{}", name), &name, table.len())?;
            0
        }
        Command::Roc { cohort } => cmd_roc(&out, cohort)?,
        Command::Plot { kind } => cmd_plot(&config, kind)?,
        Command::Run => cmd_run(&out, args.quiet)?,
        Command::Litreview {
            query,
            limit,
            strict,
            from_csv,
        } => {
            let search = match from_csv {
                Some(path) => Search::Saved(path),
                None => Search::Api {
                    query: query.as_deref(),
                    limit: *limit,
                },
            };
            cmd_litreview(&out, search, *strict).await?
        }
        Command::AuditBib { file, strict } => cmd_audit_bib(&config, file, *strict)?,
        Command::AuditText { file, output } => {
            cmd_audit_text(&config, &args.format, file, output.as_deref())?
        }
        Command::Assemble {
            output,
            sections_dir,
            sections,
        } => cmd_assemble(&config, output, sections_dir.as_deref(), sections)?,
    };

    debug!("Finished in {:.1}s", start_time.elapsed().as_secs_f64());
    Ok(code)
}

/// Where and how tables are written.
struct Output<'a> {
    config: &'a Config,
    formats: &'a [OutputFormat],
}

impl Output<'_> {
    fn save(&self, table: ResultTable, stem: &str, cohort: &str, n: usize) -> Result<()> {
        self.save_in(&self.config.paths.tables_dir, table, stem, cohort, n)
    }

    fn save_in(
        &self,
        dir: &Path,
        table: ResultTable,
        stem: &str,
        cohort: &str,
        n: usize,
    ) -> Result<()> {
        let table = table.with_metadata(ReportMetadata::new(cohort, n));
        for path in report::save_table(&table, dir, stem, self.formats)? {
            println!("   📄 {}", path.display());
        }
        Ok(())
    }
}

fn load_file(path: &Path) -> Result<(String, CohortTable)> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "input".to_string());
    let table = CohortTable::from_path(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    info!("Loaded {} ({} rows)", path.display(), table.len());
    Ok((name, table))
}

/// Resolve and load the cohort of a single-cohort command.
fn load_cohort(config: &Config, args: &CohortArgs) -> Result<(String, CohortTable)> {
    let (name, path) = config.resolve_input(args.input.as_deref(), args.cohort.as_deref())?;
    let (_, table) = load_file(&path)?;
    Ok((name, table))
}

fn cmd_setup(config: &Config, risk: bool, input: Option<&Path>) -> Result<i32> {
    let raw_path = match input {
        Some(path) => path.to_path_buf(),
        None if risk => config.paths.master_file.clone(),
        None => config.paths.raw_file.clone(),
    };
    println!("📥 Loading raw data: {}", raw_path.display());
    let raw = CohortTable::from_path(&raw_path)
        .with_context(|| format!("Failed to load {}", raw_path.display()))?;

    let (cohorts, dir) = if risk {
        let cohorts = cohort::setup::derive_risk_cohorts(raw, config)?;
        (cohorts, &config.paths.risk_dir)
    } else {
        let (summary, cohorts) = cohort::setup::derive_cohorts(raw, config)?;
        println!("\n🔬 Inclusion and imputation:");
        println!("   Rows in admitted groups: {}", summary.group_rows);
        println!("   Included: {}", summary.included);
        println!("   Imputed numeric cells: {}", summary.imputed_numeric);
        println!(
            "   Imputed diabetes cells: {} (mode {})",
            summary.imputed_diabetes,
            summary.diabetes_mode.as_deref().unwrap_or("-")
        );
        (cohorts, &config.paths.data_dir)
    };

    cohort::setup::write_cohorts(&cohorts, dir)?;

    println!("\n📊 Cohorts written to {}:", dir.display());
    let spec = cohort::GroupSpec::from(&config.groups);
    for derived in &cohorts {
        let (cases, controls) = spec.counts(&derived.table)?;
        println!(
            "   {} (N={}): {} {}, {} {}",
            derived.spec.file,
            derived.table.len(),
            cases,
            config.groups.case_name,
            controls,
            config.groups.control_name
        );
    }
    println!("\n✅ Setup complete.");
    Ok(0)
}

/// Write the configured manuscript tables. Missing cohort files are skipped.
fn write_spec_tables(out: &Output) -> Result<()> {
    let config = out.config;
    for spec in &config.tables {
        let Some(entry) = config.cohort(&spec.cohort) else {
            warn!("Table {} refers to unknown cohort '{}'", spec.stem, spec.cohort);
            continue;
        };
        let path = config.cohort_path(entry);
        if !path.exists() {
            warn!("Skipping {}: {} not found", spec.stem, path.display());
            continue;
        }
        let (_, table) = load_file(&path)?;
        let result = analysis::compare_table(&table, config, &spec.title, &spec.variables)?;
        if let Some(result) = result {
            out.save(result, &spec.stem, &entry.name, table.len())?;
        }
    }
    Ok(())
}

fn compare_cohort(out: &Output, name: &str, table: &CohortTable) -> Result<()> {
    let title = format!("Fracture vs Control Comparison ({})", name);
    let variables = unlabelled(&out.config.analysis.variables);
    match analysis::compare_table(table, out.config, &title, &variables)? {
        Some(result) => out.save(result, &format!("comparison_{}", name), name, table.len()),
        None => Ok(()),
    }
}

fn cmd_compare(out: &Output, cohort: &CohortArgs, tables: bool) -> Result<i32> {
    let (name, table) = load_cohort(out.config, cohort)?;
    println!("🔬 Comparing groups in {} (N={})", name, table.len());
    compare_cohort(out, &name, &table)?;
    if tables {
        println!("\n📝 Writing manuscript tables...");
        write_spec_tables(out)?;
    }
    Ok(0)
}

fn cmd_odds(out: &Output, cohort: &CohortArgs, mode: OddsMode) -> Result<i32> {
    let (name, table) = load_cohort(out.config, cohort)?;
    println!("🔬 Fitting odds ratios for {} (N={})", name, table.len());
    let result = analysis::odds_table(&table, out.config, &name, mode)?;
    out.save(result, &mode.stem(&name), &name, table.len())?;
    Ok(0)
}

fn cmd_baseline(out: &Output, cohort: &CohortArgs) -> Result<i32> {
    let (name, table) = load_cohort(out.config, cohort)?;
    println!("🔬 Baseline characteristics of {} (N={})", name, table.len());
    let dir = out.config.paths.tables_dir.join("advanced");
    for (stem, result) in analysis::baseline::baseline_tables(&table, out.config, &name)? {
        out.save_in(&dir, result, &stem, &name, table.len())?;
    }
    Ok(0)
}

fn cmd_subgroups(out: &Output, cohort: &CohortArgs) -> Result<i32> {
    let (name, table) = load_cohort(out.config, cohort)?;
    println!("🔬 Subgroup parameters of {} (N={})", name, table.len());
    let result = subgroup_table(&table, out.config)?;
    out.save(result, SUBGROUP_STEM, &name, table.len())?;
    Ok(0)
}

fn cmd_risk_factors(out: &Output, cohort: &CohortArgs) -> Result<i32> {
    let (name, table) = load_cohort(out.config, cohort)?;
    println!("🔬 Screening risk factors in {} (N={})", name, table.len());
    let findings = screen_risk_factors(&table, out.config)?;

    let significant: Vec<_> = findings.iter().filter(|f| f.is_significant()).collect();
    println!("   {} tests, {} significant (p<0.05)", findings.len(), significant.len());
    for finding in significant {
        println!(
            "   ⭐ {} → {}: p={:.4}, d={:.2}",
            finding.factor, finding.outcome, finding.p_value, finding.d
        );
    }

    out.save(
        risk_table(&findings),
        &format!("risk_factor_effects_{}", name),
        &name,
        table.len(),
    )?;
    Ok(0)
}

fn cmd_fractures(out: &Output, names: &[String]) -> Result<i32> {
    let config = out.config;
    let entries: Vec<_> = if names.is_empty() {
        config.cohorts.iter().collect()
    } else {
        names
            .iter()
            .map(|n| config.cohort(n).with_context(|| format!("Unknown cohort '{}'", n)))
            .collect::<Result<_>>()?
    };

    let mut loaded = Vec::new();
    for entry in entries {
        let path = config.cohort_path(entry);
        if !path.exists() {
            warn!("Skipping {}: {} not found", entry.name, path.display());
            continue;
        }
        let (_, table) = load_file(&path)?;
        loaded.push((entry.name.clone(), table));
    }
    if loaded.is_empty() {
        anyhow::bail!("No cohort files found under {}", config.paths.data_dir.display());
    }

    println!("🔬 Fracture distribution across {} cohorts", loaded.len());
    let total: usize = loaded.iter().map(|(_, t)| t.len()).sum();
    let result = fracture_table(&loaded, config)?;
    out.save(result, FRACTURE_STEM, "all", total)?;
    Ok(0)
}

fn cmd_roc(out: &Output, cohort: &CohortArgs) -> Result<i32> {
    let (name, table) = load_cohort(out.config, cohort)?;
    println!("🔬 Discrimination models for {} (N={})", name, table.len());
    let comparison = analysis::roc_models(&table, out.config)?;
    println!(
        "   {}: AUC {:.3} | {}: AUC {:.3}",
        comparison.clinical.name,
        comparison.clinical.auc,
        comparison.structural.name,
        comparison.structural.auc
    );

    out.save(comparison.to_table(&name), &format!("roc_{}", name), &name, table.len())?;

    let path = out.config.paths.figures_dir.join("Fig2_ROC.svg");
    roc_figure(
        &path,
        &format!("Diagnostic Performance ({}, n={})", name, comparison.n),
        &RocSeries {
            name: &comparison.clinical.name,
            points: &comparison.clinical.points,
            auc: comparison.clinical.auc,
        },
        &RocSeries {
            name: &comparison.structural.name,
            points: &comparison.structural.points,
            auc: comparison.structural.auc,
        },
    )?;
    println!("   🖼️  {}", path.display());
    Ok(0)
}

/// File-name-safe form of a column or label.
fn slug(text: &str) -> String {
    let mut out = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

fn all_subgroups() -> Vec<(Subgroup, &'static str)> {
    Subgroup::ALL.iter().map(|s| (*s, s.label())).collect()
}

fn cmd_plot(config: &Config, kind: &PlotKind) -> Result<i32> {
    let (name, table) = load_cohort(config, kind.cohort())?;
    let figures = &config.paths.figures_dir;

    match kind {
        PlotKind::Boxplot {
            column, reference, ..
        } => {
            let groups = box_groups(&table, config, column, &all_subgroups())?;
            let path = figures.join(format!("Boxplot_{}.svg", slug(column)));
            let label = reference.map(|v| format!("Reference ({})", v));
            let line = reference.zip(label.as_deref());
            box_plot(&path, &format!("{} ({})", column, name), column, &groups, line)?;
            println!("🖼️  {}", path.display());
        }
        PlotKind::Forest { .. } => {
            let rows = analysis::forest_rows(&table, config)?;
            if rows.is_empty() {
                anyhow::bail!("No parameter could be fitted at both sites");
            }
            let path = figures.join("forest_plot_fracture_risk.svg");
            forest_plot(
                &path,
                &format!("Fracture Risk per Quartile Decrease ({})", name),
                "Odds Ratio (95% CI)",
                &rows,
            )?;
            println!("🖼️  {}", path.display());
        }
        PlotKind::Porosity { .. } => {
            let column = &config.analysis.porosity_column;
            let groups = box_groups(
                &table,
                config,
                column,
                &[(Subgroup::DM, "DM Control"), (Subgroup::DMFx, "DM Fracture")],
            )?;
            if groups.iter().any(|(_, values)| values.len() <= 2) {
                println!("⚠️ Skipped porosity plot: insufficient data.");
                return Ok(0);
            }
            let path = figures.join("Fig3_Porosity_Diabetes.svg");
            box_plot(
                &path,
                "Cortical Porosity in Diabetic Osteopenia",
                column,
                &groups,
                None,
            )?;
            println!("🖼️  {}", path.display());
        }
        PlotKind::Dxa { .. } => {
            let threshold = config.analysis.t_score_threshold;
            let label = format!("Osteoporosis ({})", threshold);
            for variable in &config.analysis.dxa_columns {
                let groups = match box_groups(&table, config, &variable.column, &all_subgroups()) {
                    Ok(groups) => groups,
                    Err(e) => {
                        warn!("Skipping {}: {}", variable.column, e);
                        continue;
                    }
                };
                let path = figures.join(format!("Figure2_DXA_{}.svg", slug(&variable.label)));
                box_plot(
                    &path,
                    &variable.label,
                    "T-Score",
                    &groups,
                    Some((threshold, label.as_str())),
                )?;
                println!("🖼️  {}", path.display());
            }
        }
    }
    Ok(0)
}

fn cmd_run(out: &Output, quiet: bool) -> Result<i32> {
    let config = out.config;
    println!("🔬 Running compare and odds for {} cohorts", config.cohorts.len());

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(config.cohorts.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        pb
    };

    let mut processed = 0;
    for entry in &config.cohorts {
        progress.set_message(entry.name.clone());
        let path = config.cohort_path(entry);
        if !path.exists() {
            warn!("Skipping {}: {} not found", entry.name, path.display());
            progress.inc(1);
            continue;
        }

        let (_, table) = load_file(&path)?;
        compare_cohort(out, &entry.name, &table)?;
        let result = analysis::odds_table(&table, config, &entry.name, OddsMode::PerSd)?;
        out.save(result, &OddsMode::PerSd.stem(&entry.name), &entry.name, table.len())?;
        processed += 1;
        progress.inc(1);
    }
    progress.finish_and_clear();

    println!("\n📝 Writing manuscript tables...");
    write_spec_tables(out)?;

    println!(
        "\n✅ Processed {} of {} cohorts. Tables in {}",
        processed,
        config.cohorts.len(),
        config.paths.tables_dir.display()
    );
    Ok(0)
}

fn print_bib_audit(audit: &litreview::BibAudit) {
    println!("\n📚 Bibliography audit ({} entries):", audit.total_entries);
    for reference in &audit.confirmed {
        println!("   ✅ {} ({}): {}", reference.key, reference.year, reference.role);
    }
    for reference in &audit.missing {
        println!("   ❌ {} ({}): {}", reference.key, reference.year, reference.role);
    }
}

fn strict_exit(audit: &litreview::BibAudit, strict: bool) -> i32 {
    if strict && !audit.is_complete() {
        eprintln!(
            "\n⛔ {} required references missing. Failing (exit code 2).",
            audit.missing.len()
        );
        2
    } else {
        0
    }
}

/// Where the literature review gets its papers.
enum Search<'a> {
    Api {
        query: Option<&'a str>,
        limit: Option<usize>,
    },
    Saved(&'a Path),
}

async fn cmd_litreview(out: &Output<'_>, search: Search<'_>, strict: bool) -> Result<i32> {
    let settings = &out.config.litreview;
    let dir = &out.config.paths.litreview_dir;

    let papers = match search {
        Search::Api { query, limit } => {
            let query = query.unwrap_or(&settings.query);
            let limit = limit.unwrap_or(settings.limit);
            println!("🔎 Searching literature: {}", query);
            let client = litreview::SearchClient::new(settings)?;
            let papers = client.collect(settings, query, limit).await?;
            litreview::write_papers_csv(&papers, &dir.join("raw_results.csv"))?;
            papers
        }
        Search::Saved(path) => {
            println!("📥 Loading saved results: {}", path.display());
            litreview::read_papers_csv(path)?
        }
    };
    println!("   Found {} unique papers", papers.len());

    let scored = litreview::score_and_filter(papers, settings);
    litreview::write_papers_csv(&scored, &dir.join("scored_results.csv"))?;
    println!("   Kept {} papers with score ≥ {}", scored.len(), settings.min_score);

    let bib = litreview::to_bibtex(&scored);
    let bib_path = dir.join("references.bib");
    report::write_text(&bib_path, &bib)?;
    println!("   📄 {}", bib_path.display());

    let audit = litreview::audit_bibliography(&litreview::parse_bibtex(&bib), &settings.required);
    print_bib_audit(&audit);
    out.save_in(dir, audit.to_table(), "bibliography_audit", "references", audit.total_entries)?;

    Ok(strict_exit(&audit, strict))
}

fn cmd_audit_bib(config: &Config, file: &Path, strict: bool) -> Result<i32> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let entries = litreview::parse_bibtex(&text);
    let audit = litreview::audit_bibliography(&entries, &config.litreview.required);
    print_bib_audit(&audit);
    Ok(strict_exit(&audit, strict))
}

fn cmd_audit_text(
    config: &Config,
    formats: &[OutputFormat],
    file: &Path,
    output: Option<&Path>,
) -> Result<i32> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let audit = manuscript::audit_text(&text, &config.manuscript);

    let rendered = if formats.contains(&OutputFormat::Json) {
        serde_json::to_string_pretty(&audit)?
    } else {
        audit.to_markdown()
    };

    match output {
        Some(path) => {
            report::write_text(path, &rendered)?;
            println!("✅ Audit saved to: {} ({} issues)", path.display(), audit.issue_count());
        }
        None => println!("{}", rendered),
    }
    Ok(0)
}

fn cmd_assemble(
    config: &Config,
    output: &Path,
    sections_dir: Option<&Path>,
    sections: &[PathBuf],
) -> Result<i32> {
    let mut all_sections = sections.to_vec();
    if let Some(dir) = sections_dir {
        all_sections.extend(manuscript::discover_sections(dir)?);
    }

    let manuscript = manuscript::assemble(&all_sections, &config.manuscript)?;
    report::write_text(output, &manuscript)?;
    println!(
        "✅ Assembled {} sections into {}",
        all_sections.len(),
        output.display()
    );
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("L1-L4 T SCORE"), "L1_L4_T_SCORE");
        assert_eq!(slug("Femoral Neck"), "Femoral_Neck");
        assert_eq!(slug("RADIUS_CT.PO"), "RADIUS_CT_PO");
    }

    #[test]
    fn test_all_subgroups_order() {
        let labels: Vec<&str> = all_subgroups().iter().map(|(_, l)| *l).collect();
        assert_eq!(labels, vec!["Co", "Fx", "DM", "DMFx"]);
    }
}
