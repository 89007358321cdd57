use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::*;
use crate::PaydownResult;

fn default_periods() -> u32 {
    5
}

fn default_enabled() -> bool {
    true
}

/// Inputs for a single debt paydown projection.
///
/// All percentages are whole-number percents. Per-period curves are indexed by
/// forward-year offset (index 0 = first forward year); a missing index resolves
/// through [`FallbackDefaults`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumptions {
    /// Trailing-twelve-month revenue
    pub ltm_revenue: Money,
    /// Trailing-twelve-month EBITDA
    pub ltm_ebitda: Money,

    // Operating curves (per year, whole-number percents)
    #[serde(default)]
    pub revenue_growth: Vec<Percent>,
    #[serde(default)]
    pub ebitda_margins: Vec<Percent>,
    #[serde(default)]
    pub capex_percent: Vec<Percent>,

    /// One EBITDA add-back per forward year
    #[serde(default)]
    pub adjustments: Vec<Money>,
    /// Named EBITDA add-backs, summed with `adjustments` for each year
    #[serde(default)]
    pub adjustment_items: Vec<AdjustmentItem>,

    pub tax_rate: Percent,
    /// D&A as a percent of revenue
    pub da_percent: Percent,

    /// Tranches in waterfall priority (most senior first)
    #[serde(default)]
    pub debt_tranches: Vec<DebtTranche>,
    /// Single senior facility shorthand, used when `debt_tranches` is empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debt_structure: Option<DebtStructure>,

    /// Share of post-amortisation free cash flow swept to principal
    #[serde(default)]
    pub cash_sweep_percent: Percent,

    #[serde(default)]
    pub nwc: NwcMode,

    /// Number of forward years to project
    #[serde(default = "default_periods")]
    pub periods: u32,

    #[serde(default)]
    pub fallbacks: FallbackDefaults,
    #[serde(default)]
    pub range_policy: RangePolicy,

    // Calendar labelling only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_date: Option<NaiveDate>,
}

/// A single debt tranche
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtTranche {
    pub name: String,
    pub amount: Money,
    pub interest_rate: Percent,
    /// Mandatory annual amortisation as a percent of original principal
    #[serde(default)]
    pub amort_rate: Percent,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl DebtTranche {
    pub fn new(name: &str, amount: Money, interest_rate: Percent, amort_rate: Percent) -> Self {
        DebtTranche {
            name: name.to_string(),
            amount,
            interest_rate,
            amort_rate,
            enabled: true,
        }
    }
}

/// Single-tranche debt shorthand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtStructure {
    pub senior_amount: Money,
    pub interest_rate: Percent,
    #[serde(default)]
    pub amort_rate: Percent,
}

impl From<&DebtStructure> for DebtTranche {
    fn from(s: &DebtStructure) -> Self {
        DebtTranche::new("Senior", s.senior_amount, s.interest_rate, s.amort_rate)
    }
}

/// A named EBITDA add-back with one value per forward year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentItem {
    pub name: String,
    pub values: Vec<Money>,
}

/// Net working capital treatment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum NwcMode {
    /// NWC changes are ignored
    #[default]
    None,
    /// NWC is held at a percent of revenue; the change is the year-on-year delta
    PercentOfRevenue { percent: Percent },
    /// NWC change given directly per forward year
    Manual { values: Vec<Money> },
}

/// Values used when a per-period curve has no entry for a year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackDefaults {
    #[serde(default)]
    pub revenue_growth: Percent,
    #[serde(default = "FallbackDefaults::default_margin")]
    pub ebitda_margin: Percent,
    #[serde(default = "FallbackDefaults::default_capex")]
    pub capex_percent: Percent,
}

impl FallbackDefaults {
    fn default_margin() -> Percent {
        dec!(25)
    }

    fn default_capex() -> Percent {
        dec!(3)
    }
}

impl Default for FallbackDefaults {
    fn default() -> Self {
        FallbackDefaults {
            revenue_growth: Decimal::ZERO,
            ebitda_margin: Self::default_margin(),
            capex_percent: Self::default_capex(),
        }
    }
}

/// What to do with percentages and amounts outside sensible ranges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    /// Pass inputs through and report each issue as a warning
    #[default]
    Warn,
    /// Fail on the first out-of-range field
    Reject,
}

/// Per-period curves that fall back to a default when an index is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveField {
    RevenueGrowth,
    EbitdaMargin,
    CapexPercent,
}

impl CurveField {
    pub fn name(&self) -> &'static str {
        match self {
            CurveField::RevenueGrowth => "revenue_growth",
            CurveField::EbitdaMargin => "ebitda_margins",
            CurveField::CapexPercent => "capex_percent",
        }
    }
}

/// A curve value resolved for one year, noting whether the fallback was used
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub value: Percent,
    pub fallback: bool,
}

impl Assumptions {
    /// Tranches in waterfall order, with `debt_structure` normalised into a
    /// single senior tranche when no explicit tranches are given.
    pub fn tranches(&self) -> Vec<DebtTranche> {
        if !self.debt_tranches.is_empty() {
            return self.debt_tranches.clone();
        }
        self.debt_structure
            .as_ref()
            .map(|s| vec![DebtTranche::from(s)])
            .unwrap_or_default()
    }

    pub fn curve(&self, field: CurveField) -> &[Percent] {
        match field {
            CurveField::RevenueGrowth => &self.revenue_growth,
            CurveField::EbitdaMargin => &self.ebitda_margins,
            CurveField::CapexPercent => &self.capex_percent,
        }
    }

    pub fn curve_mut(&mut self, field: CurveField) -> &mut Vec<Percent> {
        match field {
            CurveField::RevenueGrowth => &mut self.revenue_growth,
            CurveField::EbitdaMargin => &mut self.ebitda_margins,
            CurveField::CapexPercent => &mut self.capex_percent,
        }
    }

    pub fn fallback_for(&self, field: CurveField) -> Percent {
        match field {
            CurveField::RevenueGrowth => self.fallbacks.revenue_growth,
            CurveField::EbitdaMargin => self.fallbacks.ebitda_margin,
            CurveField::CapexPercent => self.fallbacks.capex_percent,
        }
    }

    /// Resolve a curve value for forward year `index` (0-based).
    pub fn resolve(&self, field: CurveField, index: usize) -> Resolved {
        match self.curve(field).get(index) {
            Some(v) => Resolved {
                value: *v,
                fallback: false,
            },
            None => Resolved {
                value: self.fallback_for(field),
                fallback: true,
            },
        }
    }

    /// The curve as the engine sees it over the projection horizon.
    pub fn resolved_curve(&self, field: CurveField) -> Vec<Percent> {
        (0..self.periods as usize)
            .map(|i| self.resolve(field, i).value)
            .collect()
    }

    /// Total EBITDA add-backs for forward year `index`.
    pub fn adjustment_at(&self, index: usize) -> PaydownResult<Money> {
        let single = self.adjustments.get(index).copied().unwrap_or(Decimal::ZERO);
        let items = self
            .adjustment_items
            .iter()
            .filter_map(|item| item.values.get(index))
            .copied();
        try_sum(std::iter::once(single).chain(items), "adjustments")
    }

    /// Sum of enabled tranche principal at close, saturating at `Decimal::MAX`.
    pub fn initial_debt(&self) -> Money {
        self.tranches()
            .iter()
            .filter(|t| t.enabled)
            .fold(Decimal::ZERO, |acc, t| {
                acc.saturating_add(t.amount.max(Decimal::ZERO))
            })
    }

    /// Calendar end of `period` (0 = LTM), anchored on closing then signing date.
    pub fn period_end(&self, period: u32) -> Option<NaiveDate> {
        let anchor = self.closing_date.or(self.signing_date)?;
        anchor.checked_add_months(Months::new(12 * period))
    }

    pub fn period_label(&self, period: u32) -> String {
        if period == 0 {
            return "LTM".to_string();
        }
        match self.period_end(period) {
            Some(date) => format!("FY{}", date.year()),
            None => format!("Year {period}"),
        }
    }
}
