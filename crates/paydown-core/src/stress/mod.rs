pub mod catalog;
pub mod tester;

pub use catalog::{find_scenario, standard_scenarios, StressScenario};
pub use tester::{
    classify_risk, run_stress_suite, stress_test, RiskLevel, StressSuiteInput, StressSuiteOutput,
    StressTestResult,
};
