//! Cohort extraction command-line interface

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use cohort_study::StudyVariant;
use cohort_study::cli::extract::RunOverrides;
use cohort_study::cli::{codelists, extract, output, validate};
use std::path::PathBuf;

/// COVID-19 vaccine uptake cohort extraction
#[derive(Parser)]
#[command(name = "cohort")]
#[command(author, version, about = "COVID-19 vaccine uptake cohort extraction", long_about = None)]
struct Cli {
    /// Verbose output (-v for debug logs, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    color: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Variant {
    Main,
    FlowChart,
}

impl From<Variant> for StudyVariant {
    fn from(variant: Variant) -> Self {
        match variant {
            Variant::Main => StudyVariant::Main,
            Variant::FlowChart => StudyVariant::FlowChart,
        }
    }
}

/// Settings shared by every command; each replaces the config file value
#[derive(Args)]
struct RunArgs {
    /// Study config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Study variant
    #[arg(long, value_enum)]
    variant: Option<Variant>,

    /// Study start (index) date, YYYY-MM-DD
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Study end date, YYYY-MM-DD
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Minimum age for the main population
    #[arg(long)]
    min_age: Option<i64>,

    /// Directory holding the codelist CSV files
    #[arg(short = 'L', long)]
    codelist_dir: Option<PathBuf>,

    /// Codelist manifest (JSON); the built-in manifest by default
    #[arg(long)]
    manifest: Option<PathBuf>,
}

impl RunArgs {
    fn into_overrides(self) -> RunOverrides {
        RunOverrides {
            config: self.config,
            variant: self.variant.map(StudyVariant::from),
            start_date: self.start_date,
            end_date: self.end_date,
            min_age: self.min_age,
            codelist_dir: self.codelist_dir,
            manifest: self.manifest,
            ..RunOverrides::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every patient and write the output CSV
    Extract {
        #[command(flatten)]
        run: RunArgs,

        /// Patient data file (JSON array of records)
        #[arg(short, long)]
        patients: Option<PathBuf>,

        /// Output CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Worker threads (default: all cores)
        #[arg(short = 'j', long)]
        threads: Option<usize>,
    },

    /// Compile the study against the codelists and report diagnostics
    Validate {
        #[command(flatten)]
        run: RunArgs,

        /// Strict mode (warnings as errors)
        #[arg(short, long)]
        strict: bool,
    },

    /// List the loaded codelists
    Codelists {
        #[command(flatten)]
        run: RunArgs,

        /// Print the codelist manifest as JSON
        #[arg(long)]
        manifest_only: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: Cli) -> Result<()> {
    let verbose = cli.verbose > 0;
    match cli.command {
        Commands::Extract {
            run,
            patients,
            output,
            threads,
        } => extract::extract(extract::ExtractConfig {
            run: RunOverrides {
                patients,
                output,
                threads,
                ..run.into_overrides()
            },
            verbose,
        }),
        Commands::Validate { run, strict } => validate::validate(validate::ValidateConfig {
            run: run.into_overrides(),
            strict,
            verbose,
        }),
        Commands::Codelists { run, manifest_only } => {
            codelists::codelists(codelists::CodelistsConfig {
                run: run.into_overrides(),
                manifest_only,
            })
        }
    }
}

fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    output::setup_colors(&cli.color);
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}
