mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::analysis::{CompareArgs, SensitivityArgs, StressArgs};
use commands::projection::{CovenantArgs, ProjectArgs};

/// Debt paydown projections and credit analysis
#[derive(Parser)]
#[command(
    name = "paydown",
    version,
    about = "Debt paydown projections and credit analysis",
    long_about = "Project revenue, EBITDA, debt service and leverage for a levered deal \
                  with decimal precision. Supports covenant testing, tornado sensitivity, \
                  stress scenarios and side-by-side case comparison."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the multi-year debt paydown projection
    Project(ProjectArgs),
    /// Tornado sensitivity of a target metric to each driver
    Sensitivity(SensitivityArgs),
    /// Run stress scenarios and test covenants under each
    Stress(StressArgs),
    /// List the built-in stress scenarios
    StressCatalog,
    /// Compare named cases on a shared period axis
    Compare(CompareArgs),
    /// Test leverage, DSCR and coverage covenants year by year
    Covenants(CovenantArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Project(args) => commands::projection::run_project(args),
        Commands::Sensitivity(args) => commands::analysis::run_sensitivity(args),
        Commands::Stress(args) => commands::analysis::run_stress(args),
        Commands::StressCatalog => commands::analysis::run_stress_catalog(),
        Commands::Compare(args) => commands::analysis::run_compare(args),
        Commands::Covenants(args) => commands::projection::run_covenants(args),
        Commands::Version => {
            println!("paydown {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
