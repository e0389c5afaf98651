pub mod config;
pub mod error;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "provider")]
pub mod provider;

pub use config::ValuationConfig;
pub use error::ScreenError;
pub use types::*;

/// Standard result type for all screening operations
pub type ScreenResult<T> = Result<T, ScreenError>;
