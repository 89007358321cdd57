use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use paydown_core::comparison::{self, ComparisonInput};
use paydown_core::covenants::CovenantThresholds;
use paydown_core::sensitivity::{self, SensitivityInput, TargetMetric};
use paydown_core::stress::{self, StressSuiteInput};

use super::ThresholdArgs;
use crate::input;

/// Arguments for tornado sensitivity analysis
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to assumptions or sensitivity input (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,

    /// Target metric (exit_leverage, peak_leverage, min_dscr, average_dscr,
    /// exit_debt, paydown_percent, cumulative_interest, exit_adj_ebitda)
    #[arg(long)]
    pub metric: Option<TargetMetric>,

    /// Perturbation as a percent of each driver's base value
    #[arg(long)]
    pub variation: Option<Decimal>,
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let data = input::read_request(args.input.as_deref(), "sensitivity")?;
    let mut sens_input: SensitivityInput = if input::is_envelope(&data) {
        input::parse(data)?
    } else {
        SensitivityInput {
            assumptions: input::parse(data)?,
            target_metric: TargetMetric::ExitLeverage,
            variation_percent: dec!(20),
            variables: None,
        }
    };
    if let Some(metric) = args.metric {
        sens_input.target_metric = metric;
    }
    if let Some(variation) = args.variation {
        sens_input.variation_percent = variation;
    }

    let result = sensitivity::run_sensitivity(&sens_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for stress testing
#[derive(Args)]
pub struct StressArgs {
    /// Path to assumptions or stress suite input (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,

    /// Run a single built-in scenario by name instead of the full suite
    #[arg(long)]
    pub scenario: Option<String>,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,
}

pub fn run_stress(args: StressArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let data = input::read_request(args.input.as_deref(), "stress")?;
    let mut suite: StressSuiteInput = if input::is_envelope(&data) {
        input::parse(data)?
    } else {
        StressSuiteInput {
            assumptions: input::parse(data)?,
            thresholds: CovenantThresholds::default(),
            scenarios: None,
        }
    };
    suite.thresholds = args.thresholds.apply(suite.thresholds);

    if let Some(name) = args.scenario {
        let scenario = stress::find_scenario(&name)?;
        let result = stress::stress_test(&suite.assumptions, &scenario, &suite.thresholds)?;
        return Ok(serde_json::to_value(result)?);
    }

    let result = stress::run_stress_suite(&suite)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_stress_catalog() -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::to_value(stress::standard_scenarios())?)
}

/// Arguments for scenario comparison
#[derive(Args)]
pub struct CompareArgs {
    /// Path to assumptions or comparison input (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,

    /// Leverage ceiling used to flag years
    #[arg(long)]
    pub max_leverage: Option<Decimal>,
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let data = input::read_request(args.input.as_deref(), "compare")?;
    let mut cmp_input: ComparisonInput = if input::is_envelope(&data) {
        input::parse(data)?
    } else {
        ComparisonInput {
            assumptions: input::parse(data)?,
            variants: None,
            max_leverage: None,
        }
    };
    if args.max_leverage.is_some() {
        cmp_input.max_leverage = args.max_leverage;
    }

    let result = comparison::compare_scenarios(&cmp_input)?;
    Ok(serde_json::to_value(result)?)
}
