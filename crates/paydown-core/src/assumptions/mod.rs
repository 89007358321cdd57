pub mod model;
pub mod overrides;
pub mod validation;

pub use model::*;
pub use overrides::ScenarioOverrides;
pub use validation::{check_ranges, RangeIssue, MAX_PERIODS};
