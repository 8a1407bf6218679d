use clap::Args;
use serde_json::Value;

use fundedness_core::monte_carlo::simulation::{self, SimulationInput};
use fundedness_core::withdrawals::comparison::{self, CompareInput};

use crate::input;

/// Arguments for a Monte Carlo projection
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the number of simulated paths
    #[arg(long)]
    pub paths: Option<u32>,

    /// Drop per-path matrices and keep percentiles and aggregates
    #[arg(long)]
    pub summary: bool,
}

/// Arguments for a withdrawal strategy comparison
#[derive(Args)]
pub struct CompareArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Override the random seed shared by every strategy
    #[arg(long)]
    pub seed: Option<u64>,

    /// Keep per-strategy simulation results, not just the metrics
    #[arg(long)]
    pub full: bool,
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut sim_input: SimulationInput = input::load(args.input.as_deref(), "simulation")?;
    if let Some(seed) = args.seed {
        sim_input.config.random_seed = Some(seed);
    }
    if let Some(paths) = args.paths {
        sim_input.config.n_simulations = paths;
    }
    let mut output = simulation::run_simulation(&sim_input)?;
    if args.summary {
        output.result = output.result.summarize();
    }
    Ok(serde_json::to_value(output)?)
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut cmp_input: CompareInput = input::load(args.input.as_deref(), "strategy comparison")?;
    if let Some(seed) = args.seed {
        cmp_input.config.random_seed = Some(seed);
    }
    let mut output = comparison::compare_strategies(&cmp_input)?;
    if !args.full {
        output.result.results.clear();
    }
    Ok(serde_json::to_value(output)?)
}
