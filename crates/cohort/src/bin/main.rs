//! Cohort command-line interface

use clap::{Parser, Subcommand};
use cohort::cli::chain::{ChainConfig, Family, FindArg, SystemArg, TestResultArg};
use cohort::cli::{chain, expand, output, resolve, validate};
use std::path::PathBuf;

/// Cohort study definition tool
#[derive(Parser)]
#[command(name = "cohort")]
#[command(author, version, about = "Cohort study definitions with recurrent-event chains", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (json, pretty, table)
    #[arg(short = 'f', long, global = true)]
    format: Option<String>,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    color: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a chain of recurrent date variables
    Chain {
        /// Event source the chain repeats
        #[arg(long, value_enum)]
        family: Family,

        /// Variable name stem; occurrences are named {name}_{i}_date
        #[arg(long)]
        name: String,

        /// Number of occurrences
        #[arg(short, long)]
        n: usize,

        /// Anchor of the first occurrence
        #[arg(long, default_value = "index_date")]
        index_date: String,

        /// Chain whose occurrences later ones are anchored on
        #[arg(long)]
        index_name: Option<String>,

        /// Days between an occurrence and the next search (vaccination only)
        #[arg(long)]
        gap_days: Option<u32>,

        /// Also emit the {name}_0_date baseline variable
        #[arg(long)]
        baseline: bool,

        /// Match the baseline takes before the index date
        #[arg(long, value_enum, default_value = "first")]
        baseline_find: FindArg,

        /// SGSS test result
        #[arg(long, value_enum, default_value = "any")]
        test_result: TestResultArg,

        /// Codelist CSV; repeat to combine
        #[arg(long = "codelist")]
        codelists: Vec<String>,

        /// Coding system of the codelists
        #[arg(long, value_enum, default_value = "ctv3")]
        system: SystemArg,

        /// Code column of the codelist CSVs
        #[arg(long, default_value = "CTV3ID")]
        column: String,

        /// Admission method codes
        #[arg(long = "admission-method", value_delimiter = ',')]
        admission_methods: Vec<String>,

        /// Patient classification codes
        #[arg(long, value_delimiter = ',')]
        patient_classification: Vec<String>,

        /// Vaccination target disease
        #[arg(long)]
        target_disease: Option<String>,

        /// Vaccine product name
        #[arg(long)]
        product_name: Option<String>,
    },

    /// Expand a study manifest into a full study definition
    Expand {
        /// Study manifest (JSON)
        manifest: PathBuf,

        /// Global variables file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pretty-print output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Check study manifests for reference and expectation problems
    Validate {
        /// Study manifests to validate
        manifests: Vec<PathBuf>,

        /// Global variables file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Strict mode (warnings as errors)
        #[arg(short, long)]
        strict: bool,
    },

    /// Resolve a study's date variables against one patient's events
    Resolve {
        /// Study manifest (JSON)
        manifest: PathBuf,

        /// Patient events (JSON, keyed by query source)
        #[arg(short, long)]
        events: PathBuf,

        /// Global variables file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Report non-date variables too
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    output::setup_colors(&cli.color);

    let default_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = match cli.command {
        Commands::Chain {
            family,
            name,
            n,
            index_date,
            index_name,
            gap_days,
            baseline,
            baseline_find,
            test_result,
            codelists,
            system,
            column,
            admission_methods,
            patient_classification,
            target_disease,
            product_name,
        } => {
            let config = ChainConfig {
                family,
                name,
                n,
                index_date,
                index_name,
                gap_days,
                baseline,
                baseline_find,
                test_result,
                codelists,
                system,
                column,
                admission_methods,
                patient_classification,
                target_disease,
                product_name,
                output_format: cli.format.clone(),
                output_file: cli.output.clone(),
            };
            chain::chain(config).await
        }

        Commands::Expand {
            manifest,
            config,
            pretty,
        } => {
            let config = expand::ExpandConfig {
                manifest,
                config,
                pretty,
                output_file: cli.output.clone(),
            };
            expand::expand(config).await
        }

        Commands::Validate {
            manifests,
            config,
            strict,
        } => {
            let config = validate::ValidateConfig {
                manifests,
                config,
                strict,
            };
            validate::validate(config).await
        }

        Commands::Resolve {
            manifest,
            events,
            config,
            all,
        } => {
            let config = resolve::ResolveConfig {
                manifest,
                events,
                config,
                all,
                output_format: cli.format.clone(),
                output_file: cli.output.clone(),
            };
            resolve::resolve(config).await
        }
    };

    if let Err(e) = result {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}
