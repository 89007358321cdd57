pub mod analysis;
pub mod projection;

use clap::Args;
use rust_decimal::Decimal;

use paydown_core::covenants::CovenantThresholds;

/// Covenant levels shared by the stress and covenant commands
#[derive(Args, Debug, Clone)]
pub struct ThresholdArgs {
    /// Maximum total leverage (debt / adjusted EBITDA)
    #[arg(long)]
    pub max_leverage: Option<Decimal>,

    /// Minimum debt service coverage ratio
    #[arg(long)]
    pub min_dscr: Option<Decimal>,

    /// Minimum interest coverage (adjusted EBITDA / interest)
    #[arg(long)]
    pub min_coverage: Option<Decimal>,
}

impl ThresholdArgs {
    /// Overlay any flags onto a base set of thresholds.
    pub fn apply(&self, base: CovenantThresholds) -> CovenantThresholds {
        CovenantThresholds {
            max_leverage: self.max_leverage.unwrap_or(base.max_leverage),
            min_dscr: self.min_dscr.unwrap_or(base.min_dscr),
            min_interest_coverage: self.min_coverage.unwrap_or(base.min_interest_coverage),
        }
    }
}
