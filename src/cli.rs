//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// bonestat - cohort statistics for bone densitometry studies
///
/// Derives study cohorts from a raw clinical export, compares fracture
/// cases with controls, fits adjusted odds ratios, draws the figures, and
/// checks the manuscript and its bibliography.
///
/// Examples:
///   bonestat init-config
///   bonestat setup
///   bonestat compare --cohort osteopenia_n91
///   bonestat odds --quartile --input data/03_final/cohort_total_n215.csv
///   bonestat run --format markdown,json
///   bonestat audit-bib references.bib --strict
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for bonestat.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Table output formats (comma-separated)
    ///
    /// Defaults to markdown and csv.
    #[arg(long, global = true, value_name = "FORMAT", value_delimiter = ',')]
    pub format: Vec<OutputFormat>,

    /// Directory holding the final cohort files
    #[arg(long, global = true, value_name = "DIR", env = "BONESTAT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory for generated tables
    #[arg(long, global = true, value_name = "DIR")]
    pub tables_dir: Option<PathBuf>,

    /// Directory for generated figures
    #[arg(long, global = true, value_name = "DIR")]
    pub figures_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Cohort selection shared by the single-cohort commands.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CohortArgs {
    /// Configured cohort name
    #[arg(long, value_name = "NAME", conflicts_with = "input")]
    pub cohort: Option<String>,

    /// Cohort CSV file, instead of a configured cohort
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate a default bonestat.toml configuration file
    InitConfig,

    /// Derive the final cohort files from the raw export
    Setup {
        /// Derive the risk-factor cohorts from the master database instead
        #[arg(long)]
        risk: bool,

        /// Raw CSV, instead of the configured raw or master file
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,
    },

    /// Case vs control comparison table
    Compare {
        #[command(flatten)]
        cohort: CohortArgs,

        /// Also write the configured manuscript tables
        #[arg(long)]
        tables: bool,
    },

    /// Adjusted odds ratios per SD change
    Odds {
        #[command(flatten)]
        cohort: CohortArgs,

        /// Adjust for the FRAX score only
        #[arg(long, conflicts_with = "quartile")]
        frax: bool,

        /// Odds ratio per quartile decrease
        #[arg(long)]
        quartile: bool,
    },

    /// Baseline tests and age/BMI-adjusted odds ratios
    Baseline {
        #[command(flatten)]
        cohort: CohortArgs,
    },

    /// Co/Fx/DM/DMFx table per skeletal site
    Subgroups {
        #[command(flatten)]
        cohort: CohortArgs,
    },

    /// Effect of categorical risk factors on bone outcomes
    RiskFactors {
        #[command(flatten)]
        cohort: CohortArgs,
    },

    /// Fracture-site distribution and baseline comparison across cohorts
    Fractures {
        /// Cohorts to include (comma-separated); all configured by default
        #[arg(long, value_name = "NAMES", value_delimiter = ',')]
        cohorts: Vec<String>,
    },

    /// Descriptive statistics of numeric columns
    Describe {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Columns to describe (comma-separated); all numeric by default
        #[arg(long, value_name = "COLUMNS", value_delimiter = ',')]
        columns: Vec<String>,
    },

    /// Pearson correlation matrix with p-values
    Correlate {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Columns to correlate (comma-separated); all numeric by default
        #[arg(long, value_name = "COLUMNS", value_delimiter = ',')]
        columns: Vec<String>,
    },

    /// Ordinary least squares regression
    Regress {
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Outcome column
        #[arg(long, value_name = "COLUMN")]
        outcome: String,

        /// Predictor columns (comma-separated)
        #[arg(long, value_name = "COLUMNS", value_delimiter = ',', required = true)]
        predictors: Vec<String>,
    },

    /// Clinical vs structural discrimination with ROC figure
    Roc {
        #[command(flatten)]
        cohort: CohortArgs,
    },

    /// Draw a figure
    Plot {
        #[command(subcommand)]
        kind: PlotKind,
    },

    /// Compare and odds ratios for every configured cohort
    Run,

    /// Search, score, export BibTeX and audit the literature
    Litreview {
        /// Search query; defaults to the configured one
        #[arg(long, value_name = "QUERY")]
        query: Option<String>,

        /// Maximum search results; defaults to the configured one
        #[arg(long, value_name = "COUNT")]
        limit: Option<usize>,

        /// Exit with code 2 when a required reference is missing
        #[arg(long)]
        strict: bool,

        /// Rescore a saved raw_results.csv instead of searching
        #[arg(long, value_name = "FILE", conflicts_with_all = ["query", "limit"])]
        from_csv: Option<PathBuf>,
    },

    /// Check a BibTeX file for the required references
    AuditBib {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Exit with code 2 when a required reference is missing
        #[arg(long)]
        strict: bool,
    },

    /// Manuscript text quality audit
    AuditText {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write the report here instead of printing it
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Join section files into one manuscript
    Assemble {
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Add every Markdown file under this directory, sorted by path
        #[arg(long, value_name = "DIR")]
        sections_dir: Option<PathBuf>,

        /// Section files, in order
        #[arg(value_name = "SECTION")]
        sections: Vec<PathBuf>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum PlotKind {
    /// Box plot of one column by subgroup
    Boxplot {
        #[command(flatten)]
        cohort: CohortArgs,

        #[arg(long, value_name = "COLUMN")]
        column: String,

        /// Horizontal reference line
        #[arg(long, value_name = "VALUE", allow_negative_numbers = true)]
        reference: Option<f64>,
    },

    /// Forest plot of per-quartile odds ratios, radius vs tibia
    Forest {
        #[command(flatten)]
        cohort: CohortArgs,
    },

    /// Cortical porosity of diabetic controls vs diabetic fractures
    Porosity {
        #[command(flatten)]
        cohort: CohortArgs,
    },

    /// DXA T-scores by subgroup with the osteoporosis threshold
    Dxa {
        #[command(flatten)]
        cohort: CohortArgs,
    },
}

/// Output format for tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// CSV format
    Csv,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Litreview { limit: Some(0), .. } => {
                return Err("Limit must be at least 1".to_string());
            }
            Command::Assemble {
                sections,
                sections_dir: None,
                ..
            } if sections.is_empty() => {
                return Err("Assemble needs at least one section or --sections-dir".to_string());
            }
            Command::Regress { predictors, .. } if predictors.is_empty() => {
                return Err("Regress needs at least one predictor".to_string());
            }
            _ => {}
        }

        // Validate explicit input files
        for path in self.explicit_inputs() {
            if !path.exists() {
                return Err(format!("Input file does not exist: {}", path.display()));
            }
        }

        if let Command::Assemble {
            sections_dir: Some(dir),
            ..
        } = &self.command
        {
            if !dir.is_dir() {
                return Err(format!("Sections directory does not exist: {}", dir.display()));
            }
        }

        Ok(())
    }

    /// Files named on the command line that must already exist.
    fn explicit_inputs(&self) -> Vec<&Path> {
        let mut inputs: Vec<&Path> = Vec::new();
        if let Some(ref config) = self.config {
            inputs.push(config);
        }

        let cohort = match &self.command {
            Command::Compare { cohort, .. }
            | Command::Odds { cohort, .. }
            | Command::Baseline { cohort }
            | Command::Subgroups { cohort }
            | Command::RiskFactors { cohort }
            | Command::Roc { cohort } => Some(cohort),
            Command::Plot { kind } => Some(kind.cohort()),
            _ => None,
        };
        if let Some(path) = cohort.and_then(|c| c.input.as_deref()) {
            inputs.push(path);
        }

        match &self.command {
            Command::Setup {
                input: Some(path), ..
            } => inputs.push(path),
            Command::Describe { input, .. }
            | Command::Correlate { input, .. }
            | Command::Regress { input, .. } => inputs.push(input),
            Command::AuditBib { file, .. } | Command::AuditText { file, .. } => inputs.push(file),
            Command::Litreview {
                from_csv: Some(path),
                ..
            } => inputs.push(path),
            _ => {}
        }

        inputs
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Log level once the config file is loaded: `[general] verbose`
    /// raises the default to DEBUG unless `--quiet` is given.
    pub fn effective_log_level(&self, config_verbose: bool) -> tracing::Level {
        if config_verbose && !self.quiet {
            tracing::Level::DEBUG
        } else {
            self.log_level()
        }
    }
}

impl PlotKind {
    pub fn cohort(&self) -> &CohortArgs {
        match self {
            PlotKind::Boxplot { cohort, .. }
            | PlotKind::Forest { cohort }
            | PlotKind::Porosity { cohort }
            | PlotKind::Dxa { cohort } => cohort,
        }
    }
}
