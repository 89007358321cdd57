use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::model::{Assumptions, CurveField};
use crate::types::*;

/// A bundle of assumption overrides merged onto a base case.
///
/// Absolute curves replace the base curve outright; shifts are added in
/// percentage points to every year of the resolved base curve (after any
/// absolute replacement). The base [`Assumptions`] is never touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_growth: Option<Vec<Percent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebitda_margins: Option<Vec<Percent>>,
    /// Flat add-on to every tranche's interest rate, in percentage points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate_adjust: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_growth_shift: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebitda_margin_shift: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_sweep_percent: Option<Percent>,
    /// Resize enabled tranches pro-rata so opening debt = multiple × LTM EBITDA
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_leverage: Option<Multiple>,
}

impl ScenarioOverrides {
    pub fn is_empty(&self) -> bool {
        *self == ScenarioOverrides::default()
    }

    /// Produce a derived assumptions value with these overrides applied.
    pub fn apply(&self, base: &Assumptions) -> Assumptions {
        let mut derived = base.clone();

        if let Some(growth) = &self.revenue_growth {
            derived.revenue_growth = growth.clone();
        }
        if let Some(margins) = &self.ebitda_margins {
            derived.ebitda_margins = margins.clone();
        }
        if let Some(shift) = self.revenue_growth_shift {
            shift_curve(&mut derived, CurveField::RevenueGrowth, shift);
        }
        if let Some(shift) = self.ebitda_margin_shift {
            shift_curve(&mut derived, CurveField::EbitdaMargin, shift);
        }
        if let Some(sweep) = self.cash_sweep_percent {
            derived.cash_sweep_percent = sweep;
        }

        // Materialise the shorthand so per-tranche edits below stick.
        derived.debt_tranches = derived.tranches();
        derived.debt_structure = None;

        if let Some(adjust) = self.interest_rate_adjust {
            for tranche in derived.debt_tranches.iter_mut() {
                tranche.interest_rate = tranche.interest_rate.saturating_add(adjust);
            }
        }
        if let Some(multiple) = self.entry_leverage {
            rescale_debt(&mut derived, multiple);
        }

        derived
    }
}

fn shift_curve(assumptions: &mut Assumptions, field: CurveField, shift: Percent) {
    let shifted: Vec<Percent> = assumptions
        .resolved_curve(field)
        .into_iter()
        .map(|v| v.saturating_add(shift))
        .collect();
    *assumptions.curve_mut(field) = shifted;
}

fn rescale_debt(assumptions: &mut Assumptions, multiple: Multiple) {
    let target = assumptions.ltm_ebitda.saturating_mul(multiple).max(Decimal::ZERO);
    let current = assumptions.initial_debt();
    let enabled = assumptions.debt_tranches.iter().filter(|t| t.enabled).count();
    for tranche in assumptions.debt_tranches.iter_mut().filter(|t| t.enabled) {
        tranche.amount = if current.is_zero() {
            target / Decimal::from(enabled)
        } else {
            let amount = tranche.amount.max(Decimal::ZERO);
            match amount.checked_mul(target) {
                Some(scaled) => scaled / current,
                None => (amount / current).saturating_mul(target),
            }
        };
    }
}
