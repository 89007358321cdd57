pub mod batch;
pub mod projection;
pub mod schedule;
pub mod waterfall;

pub use projection::{
    project, run_projection, FallbackUse, ProjectionOutput, ProjectionRow, ProjectionRun,
    ProjectionSummary, TrancheRow,
};
