pub mod compliance;

pub use compliance::{
    evaluate_row, find_breaches, test_covenants, CovenantBreach, CovenantKind, CovenantResult,
    CovenantTestInput, CovenantTestOutput, CovenantThresholds, YearCompliance,
};
