use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::PaydownError;
use crate::PaydownResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Whole-number percentages (5 = 5%). Divide by 100 before use; see [`pct`].
pub type Percent = Decimal;

/// Multiples and coverage ratios (e.g., 4.25x Debt/EBITDA)
pub type Multiple = Decimal;

/// Convert a whole-number percent into a decimal fraction.
pub fn pct(value: Percent) -> Decimal {
    value / dec!(100)
}

/// Round a ratio to 2 decimal places, midpoint away from zero.
pub fn round_ratio(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `numerator / denominator`, or zero when the denominator is not positive.
/// A quotient beyond the decimal range saturates at `Decimal::MAX`/`MIN`.
pub fn ratio_or_zero(numerator: Decimal, denominator: Decimal) -> Multiple {
    if denominator <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    match numerator.checked_div(denominator) {
        Some(q) => round_ratio(q),
        None => saturated(numerator),
    }
}

/// `part / whole × 100`, or zero when `whole` is not positive.
pub fn percent_or_zero(part: Decimal, whole: Decimal) -> Percent {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    match part.checked_div(whole) {
        Some(q) => round_ratio(q.saturating_mul(dec!(100))),
        None => saturated(part),
    }
}

fn saturated(sign_of: Decimal) -> Decimal {
    if sign_of.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    }
}

/// Arithmetic mean, zero for an empty slice.
pub fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let n = Decimal::from(values.len());
    match values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
    {
        Some(total) => total / n,
        None => values
            .iter()
            .fold(Decimal::ZERO, |acc, v| acc.saturating_add(*v / n)),
    }
}

/// Error for a derived figure that leaves the representable decimal range.
pub fn overflow_error(field: &str) -> PaydownError {
    PaydownError::InvalidInput {
        field: field.to_string(),
        reason: "Derived value exceeds the representable decimal range".into(),
    }
}

/// Checked arithmetic that names the figure being computed when it overflows.
pub trait TryArith: Sized {
    fn try_add(self, rhs: Self, field: &str) -> PaydownResult<Self>;
    fn try_sub(self, rhs: Self, field: &str) -> PaydownResult<Self>;
    fn try_mul(self, rhs: Self, field: &str) -> PaydownResult<Self>;
}

impl TryArith for Decimal {
    fn try_add(self, rhs: Decimal, field: &str) -> PaydownResult<Decimal> {
        self.checked_add(rhs).ok_or_else(|| overflow_error(field))
    }

    fn try_sub(self, rhs: Decimal, field: &str) -> PaydownResult<Decimal> {
        self.checked_sub(rhs).ok_or_else(|| overflow_error(field))
    }

    fn try_mul(self, rhs: Decimal, field: &str) -> PaydownResult<Decimal> {
        self.checked_mul(rhs).ok_or_else(|| overflow_error(field))
    }
}

/// Checked sum of `values`.
pub fn try_sum<I>(values: I, field: &str) -> PaydownResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.try_add(v, field))
}

/// A value tagged with the forward year it occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearValue {
    pub year: u32,
    pub value: Decimal,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
