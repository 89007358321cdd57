pub mod metrics;
pub mod tornado;

pub use metrics::TargetMetric;
pub use tornado::{
    analyze, run_sensitivity, tornado_ranking, SensitivityCase, SensitivityInput,
    SensitivityOutput, SensitivityResult, SensitivityVariable,
};
