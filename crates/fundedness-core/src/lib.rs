pub mod error;
pub mod models;
pub mod types;

#[cfg(feature = "cefr")]
pub mod cefr;

#[cfg(feature = "simulation")]
pub mod allocation;

#[cfg(feature = "simulation")]
pub mod merton;

#[cfg(feature = "simulation")]
pub mod monte_carlo;

#[cfg(feature = "simulation")]
pub mod withdrawals;

pub use error::FundednessError;
pub use types::*;

/// Standard result type for all fundedness operations
pub type FundednessResult<T> = Result<T, FundednessError>;
