use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ScreenError;
use crate::types::Rate;
use crate::ScreenResult;

/// Real long-bond yield used to discount future cash flows.
pub const DEFAULT_DISCOUNT_RATE: Rate = dec!(0.08);

/// Perpetual growth assumed beyond the projection horizon.
pub const DEFAULT_TERMINAL_GROWTH_RATE: Rate = dec!(0.05);

/// Upper bound on the growth rate used for projection.
pub const DEFAULT_MAX_CONSERVATIVE_GROWTH_RATE: Rate = dec!(0.15);

/// Rates consumed by the valuation engine.
///
/// Passed explicitly to every entry point; there is no process-wide copy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// Discount rate for the Gordon growth denominator
    pub discount_rate: Rate,
    /// Terminal / perpetuity growth rate
    pub terminal_growth_rate: Rate,
    /// Cap applied when recent FCF growth is too aggressive to extrapolate
    pub max_conservative_growth_rate: Rate,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            discount_rate: DEFAULT_DISCOUNT_RATE,
            terminal_growth_rate: DEFAULT_TERMINAL_GROWTH_RATE,
            max_conservative_growth_rate: DEFAULT_MAX_CONSERVATIVE_GROWTH_RATE,
        }
    }
}

impl ValuationConfig {
    pub fn with_discount_rate(mut self, rate: Rate) -> Self {
        self.discount_rate = rate;
        self
    }

    pub fn with_terminal_growth_rate(mut self, rate: Rate) -> Self {
        self.terminal_growth_rate = rate;
        self
    }

    pub fn with_max_conservative_growth_rate(mut self, rate: Rate) -> Self {
        self.max_conservative_growth_rate = rate;
        self
    }

    /// Check the configuration once, before any symbol is processed.
    pub fn validate(&self) -> ScreenResult<()> {
        if self.discount_rate <= self.terminal_growth_rate {
            return Err(ScreenError::UndefinedTerminalValue {
                discount_rate: self.discount_rate,
                terminal_growth_rate: self.terminal_growth_rate,
            });
        }
        if self.terminal_growth_rate <= dec!(-1) {
            return Err(ScreenError::InvalidConfig {
                field: "terminal_growth_rate".into(),
                reason: "Must be greater than -100%".into(),
            });
        }
        if self.max_conservative_growth_rate < Decimal::ZERO {
            return Err(ScreenError::InvalidConfig {
                field: "max_conservative_growth_rate".into(),
                reason: "Must not be negative".into(),
            });
        }
        Ok(())
    }

    /// Gordon growth denominator `r - g`, guaranteed positive.
    pub fn capitalization_rate(&self) -> ScreenResult<Rate> {
        let spread = self
            .discount_rate
            .checked_sub(self.terminal_growth_rate)
            .ok_or_else(|| ScreenError::Overflow {
                context: "capitalization rate".into(),
            })?;
        if spread <= Decimal::ZERO {
            return Err(ScreenError::UndefinedTerminalValue {
                discount_rate: self.discount_rate,
                terminal_growth_rate: self.terminal_growth_rate,
            });
        }
        Ok(spread)
    }
}
