pub mod cases;

pub use cases::{
    compare_scenarios, standard_cases, CaseProjection, ComparisonInput, ComparisonOutput,
    ScenarioVariant,
};
