use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::projection::ProjectionRow;
use crate::types::*;

/// A single year in a tranche's debt schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtPeriod {
    pub year: u32,
    pub opening_balance: Money,
    pub interest: Money,
    pub scheduled_repayment: Money,
    pub sweep_repayment: Money,
    pub closing_balance: Money,
}

/// Year-by-year schedule for one tranche
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrancheSchedule {
    pub tranche_name: String,
    pub periods: Vec<DebtPeriod>,
    pub total_interest_paid: Money,
    pub total_principal_paid: Money,
    /// First forward year the tranche closes at zero, if it does
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repaid_in_year: Option<u32>,
}

/// Pivot projection rows into one schedule per tranche.
pub fn tranche_schedules(rows: &[ProjectionRow]) -> Vec<TrancheSchedule> {
    let Some(ltm) = rows.first() else {
        return Vec::new();
    };

    ltm.tranches
        .iter()
        .enumerate()
        .map(|(i, tranche)| {
            let periods: Vec<DebtPeriod> = rows[1..]
                .iter()
                .map(|row| {
                    let t = &row.tranches[i];
                    DebtPeriod {
                        year: row.period,
                        opening_balance: t.beginning_balance,
                        interest: t.interest,
                        scheduled_repayment: t.mandatory_amort,
                        sweep_repayment: t.sweep,
                        closing_balance: t.ending_balance,
                    }
                })
                .collect();

            let repaid_in_year = if tranche.beginning_balance > Decimal::ZERO {
                periods
                    .iter()
                    .find(|p| p.closing_balance.is_zero())
                    .map(|p| p.year)
            } else {
                None
            };

            TrancheSchedule {
                tranche_name: tranche.name.clone(),
                total_interest_paid: periods
                    .iter()
                    .fold(Decimal::ZERO, |acc, p| acc.saturating_add(p.interest)),
                total_principal_paid: periods
                    .iter()
                    .map(|p| p.scheduled_repayment + p.sweep_repayment)
                    .sum(),
                periods,
                repaid_in_year,
            }
        })
        .collect()
}
