use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::assumptions::ScenarioOverrides;
use crate::error::PaydownError;
use crate::PaydownResult;

/// A named adverse case applied on top of the base assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressScenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub overrides: ScenarioOverrides,
}

// ---------------------------------------------------------------------------
// Built-in adverse cases
// ---------------------------------------------------------------------------

/// The five standard stress cases, mildest first.
pub fn standard_scenarios() -> Vec<StressScenario> {
    vec![
        StressScenario {
            name: "Mild Recession".into(),
            description: "Short dip in demand with modest margin pressure".into(),
            overrides: ScenarioOverrides {
                revenue_growth: Some(vec![dec!(-3), dec!(0), dec!(2), dec!(3), dec!(3)]),
                ebitda_margins: Some(vec![dec!(23), dec!(22), dec!(23), dec!(24), dec!(24)]),
                interest_rate_adjust: Some(dec!(0.5)),
                ..Default::default()
            },
        },
        StressScenario {
            name: "Revenue Shock".into(),
            description: "Sharp top-line contraction, margins held".into(),
            overrides: ScenarioOverrides {
                revenue_growth: Some(vec![dec!(-10), dec!(-5), dec!(0), dec!(2), dec!(3)]),
                ..Default::default()
            },
        },
        StressScenario {
            name: "Margin Compression".into(),
            description: "Input cost inflation squeezes EBITDA margins".into(),
            overrides: ScenarioOverrides {
                ebitda_margins: Some(vec![dec!(20), dec!(19), dec!(19), dec!(20), dec!(21)]),
                ..Default::default()
            },
        },
        StressScenario {
            name: "Rate Spike".into(),
            description: "Rates up 300bps on every tranche".into(),
            overrides: ScenarioOverrides {
                interest_rate_adjust: Some(dec!(3.0)),
                ..Default::default()
            },
        },
        StressScenario {
            name: "Perfect Storm".into(),
            description: "Recession, margin squeeze and higher rates together".into(),
            overrides: ScenarioOverrides {
                revenue_growth: Some(vec![dec!(-8), dec!(-3), dec!(0), dec!(2), dec!(3)]),
                ebitda_margins: Some(vec![dec!(18), dec!(16), dec!(16), dec!(17), dec!(18)]),
                interest_rate_adjust: Some(dec!(1.5)),
                ..Default::default()
            },
        },
    ]
}

/// Look up a standard scenario by name, ignoring case.
pub fn find_scenario(name: &str) -> PaydownResult<StressScenario> {
    standard_scenarios()
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| PaydownError::UnknownScenario(name.to_string()))
}
