use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::model::{Assumptions, NwcMode};

/// Longest projection horizon the engine will run, in forward years.
pub const MAX_PERIODS: u32 = 50;

/// A single input outside its sensible range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeIssue {
    pub field: String,
    pub value: Decimal,
    pub reason: String,
}

impl std::fmt::Display for RangeIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}: {}", self.field, self.value, self.reason)
    }
}

struct Checker {
    issues: Vec<RangeIssue>,
}

impl Checker {
    fn within(&mut self, field: String, value: Decimal, min: Option<Decimal>, max: Option<Decimal>) {
        let reason = match (min, max) {
            (Some(lo), Some(hi)) if value < lo || value > hi => format!("expected {lo}..={hi}"),
            (Some(lo), None) if value < lo => format!("expected at least {lo}"),
            (None, Some(hi)) if value > hi => format!("expected at most {hi}"),
            _ => return,
        };
        self.issues.push(RangeIssue {
            field,
            value,
            reason,
        });
    }

    fn percent(&mut self, field: String, value: Decimal) {
        self.within(field, value, Some(Decimal::ZERO), Some(dec!(100)));
    }

    fn non_negative(&mut self, field: String, value: Decimal) {
        self.within(field, value, Some(Decimal::ZERO), None);
    }
}

/// Collect every out-of-range input. The engine decides what to do with them
/// according to [`RangePolicy`](super::model::RangePolicy).
pub fn check_ranges(a: &Assumptions) -> Vec<RangeIssue> {
    let mut c = Checker { issues: Vec::new() };

    c.within(
        "periods".into(),
        Decimal::from(a.periods),
        None,
        Some(Decimal::from(MAX_PERIODS)),
    );
    c.non_negative("ltm_revenue".into(), a.ltm_revenue);
    c.percent("tax_rate".into(), a.tax_rate);
    c.percent("da_percent".into(), a.da_percent);
    c.percent("cash_sweep_percent".into(), a.cash_sweep_percent);

    for (i, g) in a.revenue_growth.iter().enumerate() {
        c.within(format!("revenue_growth[{i}]"), *g, Some(dec!(-100)), None);
    }
    for (i, m) in a.ebitda_margins.iter().enumerate() {
        c.within(format!("ebitda_margins[{i}]"), *m, Some(dec!(-100)), Some(dec!(100)));
    }
    for (i, cx) in a.capex_percent.iter().enumerate() {
        c.percent(format!("capex_percent[{i}]"), *cx);
    }
    if let NwcMode::PercentOfRevenue { percent } = a.nwc {
        c.within("nwc.percent".into(), percent, Some(dec!(-100)), Some(dec!(100)));
    }

    for t in a.tranches() {
        c.non_negative(format!("{}.amount", t.name), t.amount);
        c.non_negative(format!("{}.interest_rate", t.name), t.interest_rate);
        c.percent(format!("{}.amort_rate", t.name), t.amort_rate);
    }

    c.issues
}
