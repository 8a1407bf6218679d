use clap::Args;
use serde_json::Value;

use fundedness_core::cefr::engine::{self, CefrInput};
use fundedness_core::cefr::liabilities::{self, LiabilityScheduleInput};

use crate::input;

/// Arguments for the funded-ratio computation
#[derive(Args)]
pub struct CefrArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Override the planning horizon in years
    #[arg(long)]
    pub horizon: Option<u32>,
}

/// Arguments for the liability schedule
#[derive(Args)]
pub struct LiabilityScheduleArgs {
    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_cefr(args: CefrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut cefr_input: CefrInput = input::load(args.input.as_deref(), "funded ratio")?;
    if let Some(h) = args.horizon {
        cefr_input.planning_horizon = h;
    }
    let result = engine::compute_cefr(&cefr_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_liability_schedule(
    args: LiabilityScheduleArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let schedule_input: LiabilityScheduleInput =
        input::load(args.input.as_deref(), "liability schedule")?;
    let result = liabilities::liability_schedule(&schedule_input)?;
    Ok(serde_json::to_value(result)?)
}
