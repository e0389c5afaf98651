use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Share counts (market cap / price, so not necessarily integral)
pub type Shares = Decimal;

/// Non-fatal data-quality findings raised while valuing a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValuationWarning {
    NegativeDebt(Money),
    NegativeDepreciation(Money),
    NegativeCapEx(Money),
}

impl fmt::Display for ValuationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValuationWarning::NegativeDebt(v) => {
                write!(f, "Debt is negative ({v}); check upstream data")
            }
            ValuationWarning::NegativeDepreciation(v) => {
                write!(f, "3-year depreciation total is negative ({v}); check upstream data")
            }
            ValuationWarning::NegativeCapEx(v) => {
                write!(f, "3-year capital expenditure total is negative ({v}); check upstream data")
            }
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
