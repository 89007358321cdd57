//! Randomized invariant checks over the projection engine.

use paydown_core::assumptions::{
    Assumptions, DebtTranche, FallbackDefaults, NwcMode, RangePolicy,
};
use paydown_core::engine::run_projection;
use proptest::prelude::*;
use rust_decimal::Decimal;

fn d(v: i64) -> Decimal {
    Decimal::from(v)
}

/// Tenths of a percent, so curves carry one decimal place.
fn tenths(v: i64) -> Decimal {
    Decimal::new(v, 1)
}

prop_compose! {
    fn arb_deal()(
        ltm_revenue in 50i64..5_000,
        growth in prop::collection::vec(-300i64..300, 0..7),
        margins in prop::collection::vec(-50i64..500, 0..7),
        senior in 0i64..6_000,
        junior in 0i64..2_000,
        senior_rate in 0i64..150,
        junior_rate in 0i64..200,
        senior_amort in 0i64..300,
        sweep in 0i64..=100,
        tax in 0i64..=40,
        periods in 0u32..8,
    ) -> Assumptions {
        Assumptions {
            ltm_revenue: d(ltm_revenue),
            ltm_ebitda: d(ltm_revenue) / d(5),
            revenue_growth: growth.into_iter().map(tenths).collect(),
            ebitda_margins: margins.into_iter().map(tenths).collect(),
            capex_percent: vec![],
            adjustments: vec![],
            adjustment_items: vec![],
            tax_rate: d(tax),
            da_percent: d(4),
            debt_tranches: vec![
                DebtTranche::new("Senior", d(senior), tenths(senior_rate), tenths(senior_amort)),
                DebtTranche::new("Junior", d(junior), tenths(junior_rate), Decimal::ZERO),
            ],
            debt_structure: None,
            cash_sweep_percent: d(sweep),
            nwc: NwcMode::None,
            periods,
            fallbacks: FallbackDefaults::default(),
            range_policy: RangePolicy::Warn,
            signing_date: None,
            closing_date: None,
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn debt_never_negative(deal in arb_deal()) {
        let run = run_projection(&deal).unwrap();
        for row in &run.output.rows {
            prop_assert!(row.ending_debt >= Decimal::ZERO);
            for t in &row.tranches {
                prop_assert!(t.ending_balance >= Decimal::ZERO);
            }
        }
    }

    #[test]
    fn amortisation_capped_by_opening_balance(deal in arb_deal()) {
        let run = run_projection(&deal).unwrap();
        for row in &run.output.rows[1..] {
            prop_assert!(row.mandatory_amort <= row.beginning_debt);
            for t in &row.tranches {
                prop_assert!(t.mandatory_amort <= t.beginning_balance);
                prop_assert!(t.mandatory_amort + t.sweep <= t.beginning_balance);
            }
        }
    }

    #[test]
    fn row_count_is_periods_plus_ltm(deal in arb_deal()) {
        let run = run_projection(&deal).unwrap();
        prop_assert_eq!(run.output.rows.len(), deal.periods as usize + 1);
        prop_assert!(run.output.rows[0].is_ltm);
    }

    #[test]
    fn no_sweep_flat_curves_never_increase_debt(
        mut deal in arb_deal(),
        growth in 0i64..100,
        margin in 100i64..400,
    ) {
        deal.cash_sweep_percent = Decimal::ZERO;
        deal.revenue_growth = vec![tenths(growth); deal.periods as usize];
        deal.ebitda_margins = vec![tenths(margin); deal.periods as usize];
        let run = run_projection(&deal).unwrap();
        for pair in run.output.rows.windows(2) {
            prop_assert!(pair[1].ending_debt <= pair[0].ending_debt);
        }
    }

    #[test]
    fn ratios_zero_without_ebitda(mut deal in arb_deal()) {
        deal.ltm_ebitda = Decimal::ZERO;
        deal.ebitda_margins = vec![Decimal::ZERO; deal.periods as usize];
        let run = run_projection(&deal).unwrap();
        for row in &run.output.rows {
            prop_assert_eq!(row.leverage_ratio, Decimal::ZERO);
            prop_assert_eq!(row.dscr, Decimal::ZERO);
        }
    }
}
