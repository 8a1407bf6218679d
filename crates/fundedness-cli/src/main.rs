mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::cefr::{CefrArgs, LiabilityScheduleArgs};
use commands::simulation::{CompareArgs, SimulateArgs};

/// Funded-ratio and retirement Monte Carlo analysis
#[derive(Parser)]
#[command(
    name = "fund",
    version,
    about = "Funded-ratio and retirement Monte Carlo analysis",
    long_about = "Computes the certainty-equivalent funded ratio of a household balance \
                  sheet and projects retirement wealth under withdrawal and allocation \
                  policies. Inputs are JSON or YAML files, or JSON piped on stdin."
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
    /// Certainty-equivalent funded ratio of a balance sheet
    Cefr(CefrArgs),
    /// Nominal liability schedule and present values
    LiabilitySchedule(LiabilityScheduleArgs),
    /// Monte Carlo wealth projection (static or policy-driven)
    Simulate(SimulateArgs),
    /// Compare withdrawal strategies on identical market paths
    Compare(CompareArgs),
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
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Cefr(args) => commands::cefr::run_cefr(args),
        Commands::LiabilitySchedule(args) => commands::cefr::run_liability_schedule(args),
        Commands::Simulate(args) => commands::simulation::run_simulate(args),
        Commands::Compare(args) => commands::simulation::run_compare(args),
        Commands::Version => {
            println!("fund {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            log::debug!("command failed: {e:?}");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
