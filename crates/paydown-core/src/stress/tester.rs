use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use super::catalog::{standard_scenarios, StressScenario};
use crate::assumptions::Assumptions;
use crate::covenants::{find_breaches, CovenantBreach, CovenantThresholds};
use crate::engine::batch::fan_out;
use crate::engine::{run_projection, ProjectionRow};
use crate::error::PaydownError;
use crate::types::*;
use crate::PaydownResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Outcome of one stress scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTestResult {
    pub scenario_name: String,
    pub description: String,
    pub breaches: Vec<CovenantBreach>,
    pub breach_count: usize,
    pub survives: bool,
    pub risk_level: RiskLevel,
    /// Highest leverage across the forward years
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_leverage: Option<YearValue>,
    /// Lowest DSCR across forward years with debt service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_dscr: Option<YearValue>,
    pub exit_leverage: Multiple,
    pub average_dscr: Multiple,
    pub paydown_percent: Percent,
    pub projections: Vec<ProjectionRow>,
}

/// Input for running a set of stress scenarios against one deal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressSuiteInput {
    pub assumptions: Assumptions,
    pub thresholds: CovenantThresholds,
    /// Scenarios to run; the standard catalog when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenarios: Option<Vec<StressScenario>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressSuiteOutput {
    pub results: Vec<StressTestResult>,
    /// Highest risk level, then most breaches, then highest leverage
    pub worst_scenario: String,
    pub survivors: usize,
    pub total_scenarios: usize,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run one stress scenario against the base case and test covenants.
pub fn stress_test(
    base: &Assumptions,
    scenario: &StressScenario,
    thresholds: &CovenantThresholds,
) -> PaydownResult<StressTestResult> {
    let stressed = scenario.overrides.apply(base);
    let run = run_projection(&stressed)?;
    let rows = run.output.rows;
    let summary = run.output.summary;

    let breaches = find_breaches(&rows, thresholds);
    let forward = &rows[1..];

    let worst_leverage = forward.iter().fold(None, |worst: Option<YearValue>, r| {
        match worst {
            Some(w) if w.value >= r.leverage_ratio => Some(w),
            _ => Some(YearValue {
                year: r.period,
                value: r.leverage_ratio,
            }),
        }
    });
    let worst_dscr = forward
        .iter()
        .filter(|r| r.has_debt_service())
        .fold(None, |worst: Option<YearValue>, r| match worst {
            Some(w) if w.value <= r.dscr => Some(w),
            _ => Some(YearValue {
                year: r.period,
                value: r.dscr,
            }),
        });

    let risk_level = classify_risk(
        breaches.len(),
        worst_leverage.map_or(Decimal::ZERO, |w| w.value),
        thresholds.max_leverage,
    );

    debug!(
        scenario = %scenario.name,
        breaches = breaches.len(),
        risk = ?risk_level,
        "stress scenario evaluated"
    );

    Ok(StressTestResult {
        scenario_name: scenario.name.clone(),
        description: scenario.description.clone(),
        breach_count: breaches.len(),
        survives: breaches.is_empty(),
        breaches,
        risk_level,
        worst_leverage,
        worst_dscr,
        exit_leverage: summary.exit_leverage,
        average_dscr: summary.average_dscr,
        paydown_percent: summary.paydown_percent,
        projections: rows,
    })
}

/// Risk bucket for a stress outcome. Rules are checked in order; the first
/// match wins.
pub fn classify_risk(breach_count: usize, worst_leverage: Multiple, max_leverage: Multiple) -> RiskLevel {
    if breach_count == 0 && worst_leverage < max_leverage * dec!(0.8) {
        RiskLevel::Low
    } else if breach_count == 0 && worst_leverage < max_leverage * dec!(0.95) {
        RiskLevel::Medium
    } else if breach_count <= 2 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

/// Run every scenario (the standard catalog by default) against one deal.
pub fn run_stress_suite(
    input: &StressSuiteInput,
) -> PaydownResult<ComputationOutput<StressSuiteOutput>> {
    let start = Instant::now();
    let scenarios = input.scenarios.clone().unwrap_or_else(standard_scenarios);
    if scenarios.is_empty() {
        return Err(PaydownError::InsufficientData(
            "At least one stress scenario required".into(),
        ));
    }

    // Surface base-case input warnings once rather than per scenario.
    let warnings = run_projection(&input.assumptions)?.warnings;

    let results: Vec<StressTestResult> = fan_out(&scenarios, |s| {
        stress_test(&input.assumptions, s, &input.thresholds)
    })
    .into_iter()
    .collect::<PaydownResult<_>>()?;

    let worst_scenario = results
        .iter()
        .max_by(|a, b| {
            a.risk_level
                .cmp(&b.risk_level)
                .then(a.breach_count.cmp(&b.breach_count))
                .then(leverage_of(a).cmp(&leverage_of(b)))
        })
        .map(|r| r.scenario_name.clone())
        .unwrap_or_default();
    let survivors = results.iter().filter(|r| r.survives).count();

    info!(
        scenarios = results.len(),
        survivors,
        worst = %worst_scenario,
        "stress suite complete"
    );

    let output = StressSuiteOutput {
        total_scenarios: results.len(),
        results,
        worst_scenario,
        survivors,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Covenant Stress Testing",
        &serde_json::json!({
            "num_scenarios": scenarios.len(),
            "max_leverage": input.thresholds.max_leverage.to_string(),
            "min_dscr": input.thresholds.min_dscr.to_string(),
            "min_interest_coverage": input.thresholds.min_interest_coverage.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn leverage_of(r: &StressTestResult) -> Decimal {
    r.worst_leverage.map_or(Decimal::ZERO, |w| w.value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::{DebtStructure, ScenarioOverrides};
    use crate::covenants::CovenantKind;
    use crate::stress::catalog::find_scenario;

    fn deal(senior: Decimal) -> Assumptions {
        Assumptions {
            ltm_revenue: dec!(500),
            ltm_ebitda: dec!(125),
            revenue_growth: vec![dec!(5), dec!(6), dec!(7), dec!(5), dec!(4)],
            ebitda_margins: vec![dec!(26), dec!(26), dec!(27), dec!(27), dec!(28)],
            capex_percent: vec![dec!(3), dec!(3), dec!(3), dec!(2.5), dec!(2.5)],
            adjustments: vec![],
            adjustment_items: vec![],
            tax_rate: dec!(25),
            da_percent: dec!(4),
            debt_tranches: vec![],
            debt_structure: Some(DebtStructure {
                senior_amount: senior,
                interest_rate: dec!(9.5),
                amort_rate: dec!(1),
            }),
            cash_sweep_percent: dec!(50),
            nwc: Default::default(),
            periods: 5,
            fallbacks: Default::default(),
            range_policy: Default::default(),
            signing_date: None,
            closing_date: None,
        }
    }

    fn no_op() -> StressScenario {
        StressScenario {
            name: "Base".into(),
            description: String::new(),
            overrides: ScenarioOverrides::default(),
        }
    }

    #[test]
    fn test_classify_risk_order() {
        let max = dec!(5);
        assert_eq!(classify_risk(0, dec!(3.99), max), RiskLevel::Low);
        assert_eq!(classify_risk(0, dec!(4.0), max), RiskLevel::Medium);
        assert_eq!(classify_risk(0, dec!(4.74), max), RiskLevel::Medium);
        assert_eq!(classify_risk(0, dec!(4.75), max), RiskLevel::High);
        assert_eq!(classify_risk(2, dec!(1.0), max), RiskLevel::High);
        assert_eq!(classify_risk(3, dec!(1.0), max), RiskLevel::Critical);
    }

    #[test]
    fn test_perfect_storm_breaches_leverage() {
        let storm = find_scenario("Perfect Storm").unwrap();
        let thresholds = CovenantThresholds {
            max_leverage: dec!(5.0),
            min_dscr: dec!(1.0),
            min_interest_coverage: dec!(1.5),
        };
        let result = stress_test(&deal(dec!(450)), &storm, &thresholds).unwrap();
        assert!(!result.survives);
        assert!(result
            .breaches
            .iter()
            .any(|b| b.covenant == CovenantKind::MaxLeverage && b.year <= 2));
        assert!(result.risk_level >= RiskLevel::High);
    }

    #[test]
    fn test_unstressed_deal_survives() {
        let result = stress_test(&deal(dec!(400)), &no_op(), &CovenantThresholds::default()).unwrap();
        assert!(result.survives);
        assert_eq!(result.breach_count, 0);
        // peak leverage 2.68x against a 5.0x covenant
        assert_eq!(result.risk_level, RiskLevel::Low);
        let worst = result.worst_leverage.unwrap();
        assert_eq!(worst.year, 1);
        assert_eq!(worst.value, dec!(2.68));
        assert_eq!(result.projections.len(), 6);
    }

    #[test]
    fn test_worst_dscr_tracked() {
        let storm = find_scenario("Perfect Storm").unwrap();
        let result = stress_test(&deal(dec!(400)), &storm, &CovenantThresholds::default()).unwrap();
        let worst = result.worst_dscr.unwrap();
        let min_row = result.projections[1..]
            .iter()
            .map(|r| r.dscr)
            .min()
            .unwrap();
        assert_eq!(worst.value, min_row);
    }

    #[test]
    fn test_base_not_mutated() {
        let base = deal(dec!(400));
        let snapshot = base.clone();
        let storm = find_scenario("Perfect Storm").unwrap();
        stress_test(&base, &storm, &CovenantThresholds::default()).unwrap();
        assert_eq!(base, snapshot);
    }

    #[test]
    fn test_suite_runs_catalog() {
        let out = run_stress_suite(&StressSuiteInput {
            assumptions: deal(dec!(450)),
            thresholds: CovenantThresholds::default(),
            scenarios: None,
        })
        .unwrap();
        assert_eq!(out.result.total_scenarios, 5);
        assert_eq!(out.result.results.len(), 5);
        assert_eq!(out.result.results[0].scenario_name, "Mild Recession");
        assert_eq!(out.result.worst_scenario, "Perfect Storm");
        assert!(out.result.survivors < 5);
    }

    #[test]
    fn test_empty_suite_rejected() {
        let err = run_stress_suite(&StressSuiteInput {
            assumptions: deal(dec!(400)),
            thresholds: CovenantThresholds::default(),
            scenarios: Some(vec![]),
        })
        .unwrap_err();
        match err {
            PaydownError::InsufficientData(_) => {}
            other => panic!("Expected InsufficientData, got {other:?}"),
        }
    }
}
