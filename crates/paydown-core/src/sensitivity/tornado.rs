use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use super::metrics::TargetMetric;
use crate::assumptions::{Assumptions, CurveField};
use crate::engine::batch::fan_out;
use crate::engine::run_projection;
use crate::error::PaydownError;
use crate::types::*;
use crate::PaydownResult;

/// Inputs perturbed one at a time by the tornado analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityVariable {
    RevenueGrowth,
    EbitdaMargin,
    InterestRate,
    CashSweep,
}

impl SensitivityVariable {
    pub const ALL: [SensitivityVariable; 4] = [
        SensitivityVariable::RevenueGrowth,
        SensitivityVariable::EbitdaMargin,
        SensitivityVariable::InterestRate,
        SensitivityVariable::CashSweep,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SensitivityVariable::RevenueGrowth => "Revenue Growth",
            SensitivityVariable::EbitdaMargin => "EBITDA Margin",
            SensitivityVariable::InterestRate => "Interest Rate",
            SensitivityVariable::CashSweep => "Cash Sweep",
        }
    }

    /// Domain bounds applied to the low/high variant values.
    fn bounds(&self) -> (Option<Percent>, Option<Percent>) {
        match self {
            SensitivityVariable::RevenueGrowth => (Some(dec!(-50)), Some(dec!(100))),
            SensitivityVariable::EbitdaMargin => (Some(dec!(5)), Some(dec!(60))),
            SensitivityVariable::InterestRate => (Some(dec!(1)), None),
            SensitivityVariable::CashSweep => (Some(Decimal::ZERO), Some(dec!(100))),
        }
    }

    fn clamp(&self, value: Percent) -> Percent {
        let (lo, hi) = self.bounds();
        let value = lo.map_or(value, |lo| value.max(lo));
        hi.map_or(value, |hi| value.min(hi))
    }

    /// Mean across the horizon for curves, amount-weighted average for the
    /// tranche rate, the scalar for the sweep.
    pub fn base_value(&self, a: &Assumptions) -> Percent {
        match self {
            SensitivityVariable::RevenueGrowth => mean(&a.resolved_curve(CurveField::RevenueGrowth)),
            SensitivityVariable::EbitdaMargin => mean(&a.resolved_curve(CurveField::EbitdaMargin)),
            SensitivityVariable::InterestRate => {
                let enabled: Vec<_> = a.tranches().into_iter().filter(|t| t.enabled).collect();
                let total = a.initial_debt();
                if total.is_zero() {
                    let rates: Vec<Percent> = enabled.iter().map(|t| t.interest_rate).collect();
                    return mean(&rates);
                }
                let weighted = enabled.iter().try_fold(Decimal::ZERO, |acc, t| {
                    acc.checked_add(t.amount.max(Decimal::ZERO).checked_mul(t.interest_rate)?)
                });
                match weighted {
                    Some(sum) => sum / total,
                    // Weight first when the products leave the decimal range.
                    None => enabled.iter().fold(Decimal::ZERO, |acc, t| {
                        acc.saturating_add(t.amount.max(Decimal::ZERO) / total * t.interest_rate)
                    }),
                }
            }
            SensitivityVariable::CashSweep => a.cash_sweep_percent,
        }
    }

    /// Clone `base` with this variable set to `value`.
    pub fn apply(&self, base: &Assumptions, value: Percent) -> Assumptions {
        let mut derived = base.clone();
        let periods = base.periods as usize;
        match self {
            SensitivityVariable::RevenueGrowth => derived.revenue_growth = vec![value; periods],
            SensitivityVariable::EbitdaMargin => derived.ebitda_margins = vec![value; periods],
            SensitivityVariable::InterestRate => {
                let shift = value.saturating_sub(self.base_value(base));
                derived.debt_tranches = base.tranches();
                derived.debt_structure = None;
                for t in derived.debt_tranches.iter_mut().filter(|t| t.enabled) {
                    t.interest_rate = t.interest_rate.saturating_add(shift).max(Decimal::ZERO);
                }
            }
            SensitivityVariable::CashSweep => derived.cash_sweep_percent = value,
        }
        derived
    }
}

/// One side of a tornado bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityCase {
    /// Variant input value (whole-number percent)
    pub value: Percent,
    /// Target metric under the variant
    pub metric_value: Decimal,
    /// `metric_value − base metric`
    pub impact: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub variable: SensitivityVariable,
    pub label: String,
    pub base_value: Percent,
    pub delta: Percent,
    pub low_case: SensitivityCase,
    pub high_case: SensitivityCase,
    /// `|low impact| + |high impact|`
    pub total_impact: Decimal,
    pub max_abs_impact: Decimal,
}

/// Input for a tornado analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub assumptions: Assumptions,
    pub target_metric: TargetMetric,
    /// Perturbation as a percent of each variable's base value
    pub variation_percent: Percent,
    /// Subset of variables to run; all four when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<SensitivityVariable>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub target_metric: TargetMetric,
    pub variation_percent: Percent,
    pub base_metric_value: Decimal,
    pub results: Vec<SensitivityResult>,
    /// Variables by descending total impact
    pub ranking: Vec<SensitivityVariable>,
}

/// One-at-a-time sensitivity over every tracked variable.
pub fn analyze(
    base: &Assumptions,
    target_metric: TargetMetric,
    variation_percent: Percent,
) -> PaydownResult<Vec<SensitivityResult>> {
    let base_metric = target_metric.extract(&run_projection(base)?.output.summary);
    analyze_variables(base, &SensitivityVariable::ALL, target_metric, variation_percent, base_metric)
}

fn analyze_variables(
    base: &Assumptions,
    variables: &[SensitivityVariable],
    target_metric: TargetMetric,
    variation_percent: Percent,
    base_metric: Decimal,
) -> PaydownResult<Vec<SensitivityResult>> {
    if variation_percent < Decimal::ZERO {
        return Err(PaydownError::InvalidInput {
            field: "variation_percent".into(),
            reason: "Variation must not be negative".into(),
        });
    }

    let run_case = |variable: SensitivityVariable, value: Percent| -> PaydownResult<SensitivityCase> {
        let variant = variable.apply(base, value);
        let metric_value = target_metric.extract(&run_projection(&variant)?.output.summary);
        Ok(SensitivityCase {
            value,
            metric_value,
            impact: metric_value.saturating_sub(base_metric),
        })
    };

    fan_out(variables, |variable| -> PaydownResult<SensitivityResult> {
        let base_value = variable.base_value(base);
        let delta = base_value
            .try_mul(pct(variation_percent), "variation_percent")?
            .abs();
        let low = base_value.try_sub(delta, "variation_percent")?;
        let high = base_value.try_add(delta, "variation_percent")?;
        let low_case = run_case(*variable, variable.clamp(low))?;
        let high_case = run_case(*variable, variable.clamp(high))?;
        Ok(SensitivityResult {
            variable: *variable,
            label: variable.label().to_string(),
            base_value,
            delta,
            total_impact: low_case.impact.abs().saturating_add(high_case.impact.abs()),
            max_abs_impact: low_case.impact.abs().max(high_case.impact.abs()),
            low_case,
            high_case,
        })
    })
    .into_iter()
    .collect()
}

/// Variables ordered for a tornado chart: widest total impact first, ties in
/// input order.
pub fn tornado_ranking(results: &[SensitivityResult]) -> Vec<SensitivityVariable> {
    let mut ordered: Vec<&SensitivityResult> = results.iter().collect();
    ordered.sort_by(|a, b| b.total_impact.cmp(&a.total_impact));
    ordered.into_iter().map(|r| r.variable).collect()
}

/// Tornado analysis wrapped in the standard output envelope.
pub fn run_sensitivity(
    input: &SensitivityInput,
) -> PaydownResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();
    let base_run = run_projection(&input.assumptions)?;
    let warnings = base_run.warnings;
    let base_metric_value = input.target_metric.extract(&base_run.output.summary);

    let variables = input
        .variables
        .clone()
        .unwrap_or_else(|| SensitivityVariable::ALL.to_vec());
    if variables.is_empty() {
        return Err(PaydownError::InsufficientData(
            "At least one sensitivity variable required".into(),
        ));
    }

    let results = analyze_variables(
        &input.assumptions,
        &variables,
        input.target_metric,
        input.variation_percent,
        base_metric_value,
    )?;
    let ranking = tornado_ranking(&results);

    info!(
        metric = input.target_metric.name(),
        variables = results.len(),
        "sensitivity analysis complete"
    );

    let output = SensitivityOutput {
        target_metric: input.target_metric,
        variation_percent: input.variation_percent,
        base_metric_value,
        results,
        ranking,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "One-at-a-Time Sensitivity (Tornado)",
        &serde_json::json!({
            "target_metric": input.target_metric.name(),
            "variation_percent": input.variation_percent.to_string(),
            "num_variables": variables.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assumptions::{DebtStructure, DebtTranche};

    fn reference_deal() -> Assumptions {
        Assumptions {
            ltm_revenue: dec!(500),
            ltm_ebitda: dec!(125),
            revenue_growth: vec![dec!(5), dec!(6), dec!(7), dec!(5), dec!(4)],
            ebitda_margins: vec![dec!(25), dec!(26), dec!(27), dec!(27), dec!(28)],
            capex_percent: vec![dec!(3), dec!(3), dec!(3), dec!(2.5), dec!(2.5)],
            adjustments: vec![],
            adjustment_items: vec![],
            tax_rate: dec!(25),
            da_percent: dec!(4),
            debt_tranches: vec![],
            debt_structure: Some(DebtStructure {
                senior_amount: dec!(400),
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

    #[test]
    fn test_base_values() {
        let a = reference_deal();
        assert_eq!(SensitivityVariable::RevenueGrowth.base_value(&a), dec!(5.4));
        assert_eq!(SensitivityVariable::EbitdaMargin.base_value(&a), dec!(26.6));
        assert_eq!(SensitivityVariable::InterestRate.base_value(&a), dec!(9.5));
        assert_eq!(SensitivityVariable::CashSweep.base_value(&a), dec!(50));
    }

    #[test]
    fn test_weighted_rate_base() {
        let mut a = reference_deal();
        a.debt_structure = None;
        a.debt_tranches = vec![
            DebtTranche::new("Senior", dec!(300), dec!(8), dec!(1)),
            DebtTranche::new("Junior", dec!(100), dec!(12), dec!(0)),
        ];
        assert_eq!(SensitivityVariable::InterestRate.base_value(&a), dec!(9));
        let shifted = SensitivityVariable::InterestRate.apply(&a, dec!(10));
        assert_eq!(shifted.debt_tranches[0].interest_rate, dec!(9));
        assert_eq!(shifted.debt_tranches[1].interest_rate, dec!(13));
    }

    #[test]
    fn test_cases_symmetric_around_base() {
        let results = analyze(&reference_deal(), TargetMetric::ExitLeverage, dec!(20)).unwrap();
        assert_eq!(results.len(), 4);
        for r in &results {
            assert_eq!(r.low_case.value + r.high_case.value, r.base_value * dec!(2));
        }
    }

    #[test]
    fn test_clamps_applied() {
        let mut a = reference_deal();
        a.cash_sweep_percent = dec!(90);
        let results = analyze(&a, TargetMetric::ExitDebt, dec!(50)).unwrap();
        let sweep = results
            .iter()
            .find(|r| r.variable == SensitivityVariable::CashSweep)
            .unwrap();
        assert_eq!(sweep.high_case.value, dec!(100));
        assert_eq!(sweep.low_case.value, dec!(45));
    }

    #[test]
    fn test_directions_are_sensible() {
        let results = analyze(&reference_deal(), TargetMetric::ExitDebt, dec!(20)).unwrap();
        let by = |v| results.iter().find(|r| r.variable == v).unwrap();
        // higher margin pays down more debt
        assert!(by(SensitivityVariable::EbitdaMargin).high_case.impact < Decimal::ZERO);
        // higher rates leave more debt outstanding
        assert!(by(SensitivityVariable::InterestRate).high_case.impact > Decimal::ZERO);
        // more sweep, less debt
        assert!(by(SensitivityVariable::CashSweep).high_case.impact < Decimal::ZERO);
    }

    #[test]
    fn test_base_not_mutated() {
        let a = reference_deal();
        let snapshot = a.clone();
        analyze(&a, TargetMetric::MinDscr, dec!(25)).unwrap();
        assert_eq!(a, snapshot);
    }

    #[test]
    fn test_ranking_descending() {
        let out = run_sensitivity(&SensitivityInput {
            assumptions: reference_deal(),
            target_metric: TargetMetric::ExitLeverage,
            variation_percent: dec!(20),
            variables: None,
        })
        .unwrap();
        let r = &out.result;
        assert_eq!(r.ranking.len(), 4);
        let impacts: Vec<Decimal> = r
            .ranking
            .iter()
            .map(|v| r.results.iter().find(|x| x.variable == *v).unwrap().total_impact)
            .collect();
        assert!(impacts.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_negative_variation_rejected() {
        assert!(analyze(&reference_deal(), TargetMetric::ExitLeverage, dec!(-5)).is_err());
    }

    #[test]
    fn test_variable_subset() {
        let out = run_sensitivity(&SensitivityInput {
            assumptions: reference_deal(),
            target_metric: TargetMetric::AverageDscr,
            variation_percent: dec!(10),
            variables: Some(vec![SensitivityVariable::InterestRate]),
        })
        .unwrap();
        assert_eq!(out.result.results.len(), 1);
        assert_eq!(out.result.ranking, vec![SensitivityVariable::InterestRate]);
    }
}
