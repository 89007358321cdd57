use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use paydown_core::assumptions::{Assumptions, RangePolicy};
use paydown_core::covenants::{self, CovenantTestInput, CovenantThresholds};
use paydown_core::engine;

use super::ThresholdArgs;
use crate::input;

/// Arguments for the paydown projection
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to assumptions file (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the number of forward years
    #[arg(long)]
    pub periods: Option<u32>,

    /// Override the excess cash sweep percent
    #[arg(long)]
    pub cash_sweep: Option<Decimal>,

    /// Fail on out-of-range inputs instead of warning
    #[arg(long)]
    pub strict: bool,
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let data = input::read_request(args.input.as_deref(), "project")?;
    let mut assumptions: Assumptions = input::parse(data)?;

    if let Some(periods) = args.periods {
        assumptions.periods = periods;
    }
    if let Some(sweep) = args.cash_sweep {
        assumptions.cash_sweep_percent = sweep;
    }
    if args.strict {
        assumptions.range_policy = RangePolicy::Reject;
    }

    let result = engine::project(&assumptions)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for covenant compliance testing
#[derive(Args)]
pub struct CovenantArgs {
    /// Path to assumptions or covenant test input (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

pub fn run_covenants(args: CovenantArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let data = input::read_request(args.input.as_deref(), "covenants")?;
    let mut test_input: CovenantTestInput = if input::is_envelope(&data) {
        input::parse(data)?
    } else {
        CovenantTestInput {
            assumptions: input::parse(data)?,
            thresholds: CovenantThresholds::default(),
        }
    };
    test_input.thresholds = args.thresholds.apply(test_input.thresholds);

    let result = covenants::test_covenants(&test_input)?;
    Ok(serde_json::to_value(result)?)
}
