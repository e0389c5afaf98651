use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which quarterly series a history check was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSeries {
    /// Income/balance-sheet style fundamentals (EBIT, D&A, cash, debt)
    Fundamentals,
    /// Cash-flow statement (capital expenditure)
    CashFlow,
    /// Merged per-quarter records handed to the aggregator
    Quarterly,
}

impl fmt::Display for DataSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSeries::Fundamentals => write!(f, "fundamentals"),
            DataSeries::CashFlow => write!(f, "cash flow"),
            DataSeries::Quarterly => write!(f, "quarterly fundamentals"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScreenError {
    #[error("No quote data found")]
    MissingQuote,

    #[error("Price is zero")]
    ZeroPrice,

    #[error("Market cap is zero")]
    ZeroMarketCap,

    #[error("Share count is zero")]
    ZeroShares,

    #[error("Insufficient history: {series} has {actual} quarters, {required} required")]
    InsufficientHistory {
        series: DataSeries,
        required: usize,
        actual: usize,
    },

    #[error("Cash is zero")]
    ZeroCash,

    #[error("3-year EBIT total is zero")]
    ZeroEbit3Yr,

    #[error("3-year depreciation total is zero")]
    ZeroDepreciation3Yr,

    #[error("3-year capital expenditure total is zero")]
    ZeroCapEx3Yr,

    #[error("Growth rate undefined: free cash flow for year {year} is zero")]
    UndefinedGrowthRate { year: usize },

    #[error("Terminal value undefined: discount rate ({discount_rate}) must exceed terminal growth rate ({terminal_growth_rate})")]
    UndefinedTerminalValue {
        discount_rate: Decimal,
        terminal_growth_rate: Decimal,
    },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Decimal overflow in {context}")]
    Overflow { context: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl ScreenError {
    /// Stable taxonomy name used in logs and failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ScreenError::MissingQuote => "MissingQuote",
            ScreenError::ZeroPrice => "ZeroPrice",
            ScreenError::ZeroMarketCap => "ZeroMarketCap",
            ScreenError::ZeroShares => "ZeroShares",
            ScreenError::InsufficientHistory { .. } => "InsufficientHistory",
            ScreenError::ZeroCash => "ZeroCash",
            ScreenError::ZeroEbit3Yr => "ZeroEbit3Yr",
            ScreenError::ZeroDepreciation3Yr => "ZeroDepreciation3Yr",
            ScreenError::ZeroCapEx3Yr => "ZeroCapEx3Yr",
            ScreenError::UndefinedGrowthRate { .. } => "UndefinedGrowthRate",
            ScreenError::UndefinedTerminalValue { .. } => "UndefinedTerminalValue",
            ScreenError::InvalidInput { .. } => "InvalidInput",
            ScreenError::InvalidConfig { .. } => "InvalidConfig",
            ScreenError::Overflow { .. } => "Overflow",
            ScreenError::Serialization(_) => "Serialization",
            ScreenError::Unexpected(_) => "UnexpectedFailure",
        }
    }

    /// Errors that invalidate a whole batch rather than a single symbol.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScreenError::UndefinedTerminalValue { .. }
                | ScreenError::InvalidConfig { .. }
                | ScreenError::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for ScreenError {
    fn from(e: serde_json::Error) -> Self {
        ScreenError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kind_names_follow_taxonomy() {
        assert_eq!(ScreenError::ZeroPrice.kind(), "ZeroPrice");
        assert_eq!(
            ScreenError::Unexpected("boom".into()).kind(),
            "UnexpectedFailure"
        );
        assert_eq!(
            ScreenError::InsufficientHistory {
                series: DataSeries::CashFlow,
                required: 12,
                actual: 11,
            }
            .kind(),
            "InsufficientHistory"
        );
    }

    #[test]
    fn test_configuration_errors_are_fatal() {
        let err = ScreenError::UndefinedTerminalValue {
            discount_rate: dec!(0.05),
            terminal_growth_rate: dec!(0.05),
        };
        assert!(err.is_fatal());
        assert!(!ScreenError::ZeroCash.is_fatal());
        assert!(!ScreenError::UndefinedGrowthRate { year: 1 }.is_fatal());
    }

    #[test]
    fn test_insufficient_history_message_names_series() {
        let err = ScreenError::InsufficientHistory {
            series: DataSeries::CashFlow,
            required: 12,
            actual: 8,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient history: cash flow has 8 quarters, 12 required"
        );
    }
}
