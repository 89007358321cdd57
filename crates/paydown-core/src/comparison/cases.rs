use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use crate::assumptions::{Assumptions, ScenarioOverrides};
use crate::engine::batch::fan_out;
use crate::engine::{run_projection, ProjectionRow};
use crate::error::PaydownError;
use crate::types::*;
use crate::PaydownResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A named what-if case layered over the base assumptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioVariant {
    pub name: String,
    #[serde(flatten)]
    pub overrides: ScenarioOverrides,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonInput {
    pub assumptions: Assumptions,
    /// Cases to run; base/upside/downside when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<ScenarioVariant>>,
    /// Leverage ceiling used to flag years; 5.0x when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_leverage: Option<Multiple>,
}

/// One case's projection on the shared period axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseProjection {
    pub name: String,
    pub projections: Vec<ProjectionRow>,
    /// One flag per row: leverage above the ceiling
    pub leverage_flags: Vec<bool>,
    pub flagged_years: Vec<u32>,
    pub exit_leverage: Multiple,
    pub peak_leverage: Multiple,
    pub paydown_percent: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonOutput {
    pub period_labels: Vec<String>,
    pub max_leverage: Multiple,
    pub cases: Vec<CaseProjection>,
}

const DEFAULT_MAX_LEVERAGE: Decimal = dec!(5.0);

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Preset base, upside and downside cases.
pub fn standard_cases() -> Vec<ScenarioVariant> {
    vec![
        ScenarioVariant {
            name: "Base".into(),
            overrides: ScenarioOverrides::default(),
        },
        ScenarioVariant {
            name: "Upside".into(),
            overrides: ScenarioOverrides {
                revenue_growth_shift: Some(dec!(2)),
                ebitda_margin_shift: Some(dec!(2)),
                ..Default::default()
            },
        },
        ScenarioVariant {
            name: "Downside".into(),
            overrides: ScenarioOverrides {
                revenue_growth_shift: Some(dec!(-4)),
                ebitda_margin_shift: Some(dec!(-3)),
                interest_rate_adjust: Some(dec!(1)),
                ..Default::default()
            },
        },
    ]
}

/// Run the engine once per case and line the results up by period.
pub fn compare_scenarios(
    input: &ComparisonInput,
) -> PaydownResult<ComputationOutput<ComparisonOutput>> {
    let start = Instant::now();
    let variants = input.variants.clone().unwrap_or_else(standard_cases);
    if variants.is_empty() {
        return Err(PaydownError::InsufficientData(
            "At least one comparison case required".into(),
        ));
    }
    let max_leverage = input.max_leverage.unwrap_or(DEFAULT_MAX_LEVERAGE);
    if max_leverage <= Decimal::ZERO {
        return Err(PaydownError::InvalidInput {
            field: "max_leverage".into(),
            reason: "Leverage ceiling must be positive".into(),
        });
    }

    let runs = fan_out(&variants, |v| -> PaydownResult<_> {
        let run = run_projection(&v.overrides.apply(&input.assumptions))?;
        Ok((v.name.clone(), run))
    });

    let mut warnings: Vec<String> = Vec::new();
    let mut cases = Vec::with_capacity(variants.len());
    for run in runs {
        let (name, run) = run?;
        for w in run.warnings {
            warnings.push(format!("{name}: {w}"));
        }
        let rows = run.output.rows;
        let leverage_flags: Vec<bool> = rows
            .iter()
            .map(|r| r.leverage_ratio > max_leverage)
            .collect();
        let flagged_years = rows
            .iter()
            .filter(|r| !r.is_ltm && r.leverage_ratio > max_leverage)
            .map(|r| r.period)
            .collect();
        cases.push(CaseProjection {
            name,
            leverage_flags,
            flagged_years,
            exit_leverage: run.output.summary.exit_leverage,
            peak_leverage: run.output.summary.peak_leverage,
            paydown_percent: run.output.summary.paydown_percent,
            projections: rows,
        });
    }

    let period_labels = cases
        .first()
        .map(|c| c.projections.iter().map(|r| r.label.clone()).collect())
        .unwrap_or_default();

    info!(cases = cases.len(), "scenario comparison complete");

    let output = ComparisonOutput {
        period_labels,
        max_leverage,
        cases,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Scenario Comparison",
        &serde_json::json!({
            "num_cases": variants.len(),
            "max_leverage": max_leverage.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::DebtTranche;

    fn deal() -> Assumptions {
        Assumptions {
            ltm_revenue: dec!(500),
            ltm_ebitda: dec!(125),
            revenue_growth: vec![dec!(5); 5],
            ebitda_margins: vec![dec!(25); 5],
            capex_percent: vec![dec!(3); 5],
            adjustments: vec![],
            adjustment_items: vec![],
            tax_rate: dec!(25),
            da_percent: dec!(4),
            debt_tranches: vec![
                DebtTranche::new("Senior", dec!(300), dec!(8), dec!(1)),
                DebtTranche::new("Mezz", dec!(100), dec!(12), dec!(0)),
            ],
            debt_structure: None,
            cash_sweep_percent: dec!(50),
            nwc: Default::default(),
            periods: 5,
            fallbacks: Default::default(),
            range_policy: Default::default(),
            signing_date: None,
            closing_date: None,
        }
    }

    fn input(variants: Option<Vec<ScenarioVariant>>, max: Option<Decimal>) -> ComparisonInput {
        ComparisonInput {
            assumptions: deal(),
            variants,
            max_leverage: max,
        }
    }

    #[test]
    fn test_standard_cases_order() {
        let out = compare_scenarios(&input(None, None)).unwrap();
        let names: Vec<&str> = out.result.cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Base", "Upside", "Downside"]);
        assert_eq!(out.result.max_leverage, dec!(5.0));
    }

    #[test]
    fn test_shared_period_axis() {
        let out = compare_scenarios(&input(None, None)).unwrap();
        assert_eq!(out.result.period_labels.len(), 6);
        assert_eq!(out.result.period_labels[0], "LTM");
        for case in &out.result.cases {
            assert_eq!(case.projections.len(), 6);
            assert_eq!(case.leverage_flags.len(), 6);
        }
    }

    #[test]
    fn test_upside_pays_down_faster() {
        let out = compare_scenarios(&input(None, None)).unwrap();
        let base = &out.result.cases[0];
        let up = &out.result.cases[1];
        let down = &out.result.cases[2];
        assert!(up.exit_leverage < base.exit_leverage);
        assert!(down.exit_leverage > base.exit_leverage);
        assert!(up.paydown_percent > down.paydown_percent);
    }

    #[test]
    fn test_leverage_flags_against_threshold() {
        let levered = ScenarioVariant {
            name: "Levered".into(),
            overrides: ScenarioOverrides {
                entry_leverage: Some(dec!(6)),
                ..Default::default()
            },
        };
        let out = compare_scenarios(&input(Some(vec![levered]), Some(dec!(4)))).unwrap();
        let case = &out.result.cases[0];
        // 6.0x at close against a 4.0x ceiling
        assert!(case.leverage_flags[0]);
        assert!(case.flagged_years.contains(&1));
        assert!(!case.flagged_years.contains(&0));
    }

    #[test]
    fn test_empty_variants_rejected() {
        let err = compare_scenarios(&input(Some(vec![]), None)).unwrap_err();
        match err {
            PaydownError::InsufficientData(_) => {}
            other => panic!("Expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn test_non_positive_ceiling_rejected() {
        assert!(compare_scenarios(&input(None, Some(Decimal::ZERO))).is_err());
    }
}
