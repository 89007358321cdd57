use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::assumptions::Assumptions;
use crate::engine::{run_projection, ProjectionRow};
use crate::types::*;
use crate::PaydownResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

/// Maintenance covenant levels supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovenantThresholds {
    pub max_leverage: Multiple,
    pub min_dscr: Multiple,
    pub min_interest_coverage: Multiple,
}

impl Default for CovenantThresholds {
    fn default() -> Self {
        CovenantThresholds {
            max_leverage: dec!(5.0),
            min_dscr: dec!(1.25),
            min_interest_coverage: dec!(2.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovenantKind {
    /// Ending debt / adjusted EBITDA must not exceed the threshold.
    MaxLeverage,
    /// Adjusted EBITDA / (interest + mandatory amortisation) must not fall below.
    MinDscr,
    /// Adjusted EBITDA / interest must not fall below.
    MinInterestCoverage,
}

impl CovenantKind {
    pub const ALL: [CovenantKind; 3] = [
        CovenantKind::MaxLeverage,
        CovenantKind::MinDscr,
        CovenantKind::MinInterestCoverage,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CovenantKind::MaxLeverage => "Max Leverage",
            CovenantKind::MinDscr => "Min DSCR",
            CovenantKind::MinInterestCoverage => "Min Interest Coverage",
        }
    }

    pub fn threshold(&self, t: &CovenantThresholds) -> Multiple {
        match self {
            CovenantKind::MaxLeverage => t.max_leverage,
            CovenantKind::MinDscr => t.min_dscr,
            CovenantKind::MinInterestCoverage => t.min_interest_coverage,
        }
    }
}

/// One violated covenant in one year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovenantBreach {
    pub year: u32,
    pub covenant: CovenantKind,
    pub threshold: Multiple,
    pub actual_value: Multiple,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovenantResult {
    pub covenant: CovenantKind,
    pub threshold: Multiple,
    pub actual: Multiple,
    /// False when the ratio is undefined for the year (no debt service)
    pub applicable: bool,
    pub passing: bool,
    pub headroom: Decimal,
    /// Headroom as a percent of the threshold
    pub headroom_pct: Percent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearCompliance {
    pub year: u32,
    pub label: String,
    pub results: Vec<CovenantResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovenantTestInput {
    pub assumptions: Assumptions,
    pub thresholds: CovenantThresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovenantTestOutput {
    pub years: Vec<YearCompliance>,
    pub breaches: Vec<CovenantBreach>,
    pub all_passing: bool,
    /// Applicable test with the least headroom across all years
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tightest: Option<TightestCovenant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TightestCovenant {
    pub year: u32,
    pub covenant: CovenantKind,
    pub headroom_pct: Percent,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project the base case and test every forward year against the thresholds.
pub fn test_covenants(
    input: &CovenantTestInput,
) -> PaydownResult<ComputationOutput<CovenantTestOutput>> {
    let start = Instant::now();
    let run = run_projection(&input.assumptions)?;
    let warnings = run.warnings;
    let rows = &run.output.rows;

    let years: Vec<YearCompliance> = rows[1..]
        .iter()
        .map(|row| YearCompliance {
            year: row.period,
            label: row.label.clone(),
            results: evaluate_row(row, &input.thresholds),
        })
        .collect();

    let breaches = find_breaches(rows, &input.thresholds);
    let tightest = years
        .iter()
        .flat_map(|y| {
            y.results
                .iter()
                .filter(|r| r.applicable)
                .map(move |r| TightestCovenant {
                    year: y.year,
                    covenant: r.covenant,
                    headroom_pct: r.headroom_pct,
                })
        })
        .min_by(|a, b| a.headroom_pct.cmp(&b.headroom_pct));

    let output = CovenantTestOutput {
        all_passing: breaches.is_empty(),
        years,
        breaches,
        tightest,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Maintenance Covenant Compliance",
        &serde_json::json!({
            "max_leverage": input.thresholds.max_leverage.to_string(),
            "min_dscr": input.thresholds.min_dscr.to_string(),
            "min_interest_coverage": input.thresholds.min_interest_coverage.to_string(),
            "periods": input.assumptions.periods,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Test one projection row against each covenant independently.
pub fn evaluate_row(row: &ProjectionRow, thresholds: &CovenantThresholds) -> Vec<CovenantResult> {
    CovenantKind::ALL
        .iter()
        .map(|kind| evaluate(row, *kind, kind.threshold(thresholds)))
        .collect()
}

/// Every breach across the forward years, in year then covenant order.
pub fn find_breaches(rows: &[ProjectionRow], thresholds: &CovenantThresholds) -> Vec<CovenantBreach> {
    rows.iter()
        .filter(|r| !r.is_ltm)
        .flat_map(|row| {
            evaluate_row(row, thresholds)
                .into_iter()
                .filter(|r| r.applicable && !r.passing)
                .map(move |r| CovenantBreach {
                    year: row.period,
                    covenant: r.covenant,
                    threshold: r.threshold,
                    actual_value: r.actual,
                })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn evaluate(row: &ProjectionRow, kind: CovenantKind, threshold: Multiple) -> CovenantResult {
    let mut note = None;
    let (actual, applicable, passing, headroom) = match kind {
        CovenantKind::MaxLeverage => {
            let actual = row.leverage_ratio;
            if row.adj_ebitda <= Decimal::ZERO && row.ending_debt > Decimal::ZERO {
                // The ratio reports 0 here; debt against no earnings still fails.
                note = Some("adjusted EBITDA non-positive with debt outstanding".to_string());
                (actual, true, false, Decimal::ZERO)
            } else {
                (actual, true, actual <= threshold, threshold.saturating_sub(actual))
            }
        }
        CovenantKind::MinDscr => {
            let actual = row.dscr;
            if row.has_debt_service() {
                (actual, true, actual >= threshold, actual.saturating_sub(threshold))
            } else {
                note = Some("no debt service".to_string());
                (actual, false, true, Decimal::ZERO)
            }
        }
        CovenantKind::MinInterestCoverage => {
            let actual = row.interest_coverage;
            if row.interest > Decimal::ZERO {
                (actual, true, actual >= threshold, actual.saturating_sub(threshold))
            } else {
                note = Some("no interest expense".to_string());
                (actual, false, true, Decimal::ZERO)
            }
        }
    };

    let headroom_pct = match headroom.checked_div(threshold) {
        _ if threshold.is_zero() => Decimal::ZERO,
        Some(q) => round_ratio(q.saturating_mul(dec!(100))),
        None if headroom.is_sign_negative() != threshold.is_sign_negative() => Decimal::MIN,
        None => Decimal::MAX,
    };

    CovenantResult {
        covenant: kind,
        threshold,
        actual,
        applicable,
        passing,
        headroom,
        headroom_pct,
        note,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
