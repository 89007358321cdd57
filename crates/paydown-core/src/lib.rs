pub mod assumptions;
pub mod engine;
pub mod error;
pub mod types;

#[cfg(feature = "covenants")]
pub mod covenants;

#[cfg(feature = "sensitivity")]
pub mod sensitivity;

#[cfg(feature = "stress")]
pub mod stress;

#[cfg(feature = "comparison")]
pub mod comparison;

pub use error::PaydownError;
pub use types::*;

/// Standard result type for all paydown computations
pub type PaydownResult<T> = Result<T, PaydownError>;
