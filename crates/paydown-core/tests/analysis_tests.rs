use paydown_core::assumptions::{
    Assumptions, DebtStructure, FallbackDefaults, NwcMode, RangePolicy, ScenarioOverrides,
};
use paydown_core::comparison::{compare_scenarios, ComparisonInput};
use paydown_core::covenants::{test_covenants, CovenantKind, CovenantTestInput, CovenantThresholds};
use paydown_core::sensitivity::{analyze, run_sensitivity, SensitivityInput, TargetMetric};
use paydown_core::stress::{
    classify_risk, find_scenario, run_stress_suite, stress_test, RiskLevel, StressScenario,
    StressSuiteInput,
};
use paydown_core::PaydownError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn deal(senior: Decimal) -> Assumptions {
    Assumptions {
        ltm_revenue: dec!(500),
        ltm_ebitda: dec!(125),
        revenue_growth: vec![dec!(5), dec!(6), dec!(7), dec!(5), dec!(4)],
        ebitda_margins: vec![dec!(25), dec!(26), dec!(27), dec!(27), dec!(28)],
        capex_percent: vec![dec!(3); 5],
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
        nwc: NwcMode::None,
        periods: 5,
        fallbacks: FallbackDefaults::default(),
        range_policy: RangePolicy::Warn,
        signing_date: None,
        closing_date: None,
    }
}

fn thresholds() -> CovenantThresholds {
    CovenantThresholds {
        max_leverage: dec!(5.0),
        min_dscr: dec!(1.25),
        min_interest_coverage: dec!(2.0),
    }
}

// ===========================================================================
// Stress testing
// ===========================================================================

#[test]
fn test_perfect_storm_breaches_early() {
    let storm = find_scenario("perfect storm").unwrap();
    let result = stress_test(&deal(dec!(450)), &storm, &thresholds()).unwrap();
    assert!(!result.survives);
    let early_leverage: Vec<u32> = result
        .breaches
        .iter()
        .filter(|b| b.covenant == CovenantKind::MaxLeverage)
        .map(|b| b.year)
        .filter(|y| *y <= 2)
        .collect();
    assert!(!early_leverage.is_empty());
    assert_eq!(result.breach_count, result.breaches.len());
}

#[test]
fn test_covenants_evaluated_independently() {
    let storm = find_scenario("Perfect Storm").unwrap();
    let result = stress_test(&deal(dec!(450)), &storm, &thresholds()).unwrap();
    let year_one: Vec<CovenantKind> = result
        .breaches
        .iter()
        .filter(|b| b.year == 1)
        .map(|b| b.covenant)
        .collect();
    // ~440 / 82.8 = 5.31x levered and 82.8 / 49.5 = 1.67x coverage
    assert!(year_one.contains(&CovenantKind::MaxLeverage));
    assert!(year_one.contains(&CovenantKind::MinInterestCoverage));
}

#[test]
fn test_risk_boundaries_around_eighty_percent() {
    let max = dec!(5.0);
    let eps = dec!(0.0001);
    assert_eq!(classify_risk(0, dec!(4.0) - eps, max), RiskLevel::Low);
    assert_eq!(classify_risk(0, dec!(4.0) + eps, max), RiskLevel::Medium);
    assert_eq!(classify_risk(1, dec!(4.0) - eps, max), RiskLevel::High);
}

#[test]
fn test_stress_is_deterministic() {
    let input = StressSuiteInput {
        assumptions: deal(dec!(450)),
        thresholds: thresholds(),
        scenarios: None,
    };
    let first = run_stress_suite(&input).unwrap().result;
    let second = run_stress_suite(&input).unwrap().result;
    assert_eq!(first.results, second.results);
    assert_eq!(first.worst_scenario, second.worst_scenario);
}

#[test]
fn test_custom_scenario_from_json() {
    let json = r#"{
        "name": "Refi Wall",
        "description": "Rates up, sweep switched off",
        "interest_rate_adjust": "2.0",
        "cash_sweep_percent": "0"
    }"#;
    let scenario: StressScenario = serde_json::from_str(json).unwrap();
    assert_eq!(scenario.overrides.cash_sweep_percent, Some(Decimal::ZERO));
    let result = stress_test(&deal(dec!(400)), &scenario, &thresholds()).unwrap();
    let y1 = &result.projections[1];
    // 400 * 11.5%
    assert_eq!(y1.interest, dec!(46));
    assert_eq!(y1.sweep, Decimal::ZERO);
}

#[test]
fn test_unknown_scenario() {
    match find_scenario("Zombie Apocalypse").unwrap_err() {
        PaydownError::UnknownScenario(name) => assert_eq!(name, "Zombie Apocalypse"),
        other => panic!("Expected UnknownScenario, got {other:?}"),
    }
}

// ===========================================================================
// Covenant compliance
// ===========================================================================

#[test]
fn test_base_case_complies() {
    let out = test_covenants(&CovenantTestInput {
        assumptions: deal(dec!(400)),
        thresholds: thresholds(),
    })
    .unwrap();
    assert!(out.result.all_passing);
    assert!(out.result.breaches.is_empty());
    assert!(out.result.tightest.is_some());
}

// ===========================================================================
// Sensitivity
// ===========================================================================

#[test]
fn test_twenty_percent_variation_is_symmetric() {
    let results = analyze(&deal(dec!(400)), TargetMetric::ExitLeverage, dec!(20)).unwrap();
    assert_eq!(results.len(), 4);
    for r in &results {
        assert_eq!(r.low_case.value + r.high_case.value, r.base_value * dec!(2));
    }
}

#[test]
fn test_margin_is_a_top_driver_of_exit_leverage() {
    let out = run_sensitivity(&SensitivityInput {
        assumptions: deal(dec!(400)),
        target_metric: TargetMetric::ExitLeverage,
        variation_percent: dec!(20),
        variables: None,
    })
    .unwrap();
    let ranking = &out.result.ranking;
    assert_eq!(ranking.len(), 4);
    let top = &out.result.results.iter().find(|r| r.variable == ranking[0]).unwrap();
    for r in &out.result.results {
        assert!(top.total_impact >= r.total_impact);
    }
}

#[test]
fn test_negative_variation_rejected() {
    assert!(analyze(&deal(dec!(400)), TargetMetric::ExitDebt, dec!(-5)).is_err());
}

// ===========================================================================
// Scenario comparison
// ===========================================================================

#[test]
fn test_comparison_matches_direct_projection() {
    let base = deal(dec!(400));
    let out = compare_scenarios(&ComparisonInput {
        assumptions: base.clone(),
        variants: None,
        max_leverage: Some(dec!(3)),
    })
    .unwrap();
    let direct = paydown_core::engine::project(&base).unwrap();
    assert_eq!(out.result.cases[0].projections, direct.result.rows);
    // LTM 3.2x sits above a 3.0x ceiling
    assert!(out.result.cases[0].leverage_flags[0]);
}

#[test]
fn test_entry_leverage_override_sets_opening_debt() {
    let overrides = ScenarioOverrides {
        entry_leverage: Some(dec!(4)),
        ..Default::default()
    };
    let derived = overrides.apply(&deal(dec!(400)));
    assert_eq!(derived.initial_debt(), dec!(500));
}

// ===========================================================================
// Parallel fan-out
// ===========================================================================

#[cfg(feature = "parallel")]
mod parallel {
    use pretty_assertions::assert_eq;
    use super::*;
    use paydown_core::comparison::standard_cases;
    use paydown_core::engine::run_projection;
    use paydown_core::sensitivity::SensitivityVariable;
    use paydown_core::stress::{standard_scenarios, StressTestResult};

    #[test]
    fn test_stress_suite_matches_sequential_runs() {
        let base = deal(dec!(450));
        let suite = run_stress_suite(&StressSuiteInput {
            assumptions: base.clone(),
            thresholds: thresholds(),
            scenarios: None,
        })
        .unwrap();

        let sequential: Vec<StressTestResult> = standard_scenarios()
            .iter()
            .map(|s| stress_test(&base, s, &thresholds()).unwrap())
            .collect();
        assert_eq!(suite.result.results, sequential);
    }

    #[test]
    fn test_sensitivity_matches_sequential_runs() {
        let base = deal(dec!(400));
        let metric = TargetMetric::ExitLeverage;
        let results = analyze(&base, metric, dec!(20)).unwrap();

        let order: Vec<SensitivityVariable> = results.iter().map(|r| r.variable).collect();
        assert_eq!(order, SensitivityVariable::ALL.to_vec());
        for r in &results {
            for case in [&r.low_case, &r.high_case] {
                let run = run_projection(&r.variable.apply(&base, case.value)).unwrap();
                assert_eq!(metric.extract(&run.output.summary), case.metric_value);
            }
        }
    }

    #[test]
    fn test_comparison_matches_sequential_runs() {
        let base = deal(dec!(400));
        let out = compare_scenarios(&ComparisonInput {
            assumptions: base.clone(),
            variants: None,
            max_leverage: None,
        })
        .unwrap();

        for (case, variant) in out.result.cases.iter().zip(standard_cases()) {
            assert_eq!(case.name, variant.name);
            let run = run_projection(&variant.overrides.apply(&base)).unwrap();
            assert_eq!(case.projections, run.output.rows);
        }
    }
}
