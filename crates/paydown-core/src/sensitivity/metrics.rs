use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::engine::ProjectionSummary;
use crate::error::PaydownError;
use crate::types::*;

/// Output metric a sensitivity run is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMetric {
    ExitLeverage,
    PeakLeverage,
    MinDscr,
    AverageDscr,
    ExitDebt,
    PaydownPercent,
    CumulativeInterest,
    ExitAdjEbitda,
}

impl TargetMetric {
    pub const ALL: [TargetMetric; 8] = [
        TargetMetric::ExitLeverage,
        TargetMetric::PeakLeverage,
        TargetMetric::MinDscr,
        TargetMetric::AverageDscr,
        TargetMetric::ExitDebt,
        TargetMetric::PaydownPercent,
        TargetMetric::CumulativeInterest,
        TargetMetric::ExitAdjEbitda,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TargetMetric::ExitLeverage => "exit_leverage",
            TargetMetric::PeakLeverage => "peak_leverage",
            TargetMetric::MinDscr => "min_dscr",
            TargetMetric::AverageDscr => "average_dscr",
            TargetMetric::ExitDebt => "exit_debt",
            TargetMetric::PaydownPercent => "paydown_percent",
            TargetMetric::CumulativeInterest => "cumulative_interest",
            TargetMetric::ExitAdjEbitda => "exit_adj_ebitda",
        }
    }

    pub fn extract(&self, summary: &ProjectionSummary) -> Money {
        match self {
            TargetMetric::ExitLeverage => summary.exit_leverage,
            TargetMetric::PeakLeverage => summary.peak_leverage,
            TargetMetric::MinDscr => summary.min_dscr,
            TargetMetric::AverageDscr => summary.average_dscr,
            TargetMetric::ExitDebt => summary.exit_debt,
            TargetMetric::PaydownPercent => summary.paydown_percent,
            TargetMetric::CumulativeInterest => summary.cumulative_interest,
            TargetMetric::ExitAdjEbitda => summary.exit_adj_ebitda,
        }
    }
}

impl FromStr for TargetMetric {
    type Err = PaydownError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        TargetMetric::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| PaydownError::InvalidInput {
                field: "target_metric".into(),
                reason: format!(
                    "Unknown metric '{s}'. Available: {}",
                    TargetMetric::ALL.map(|m| m.name()).join(", ")
                ),
            })
    }
}
