use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ScreenError;
use crate::types::{Money, Shares};
use crate::ScreenResult;

use super::{arith, dcf};

/// Point-in-time market data for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: Money,
    pub market_cap: Money,
    /// Average total volume; informational only
    #[serde(default)]
    pub volume: Decimal,
}

impl Quote {
    /// Implied share count, `market_cap / price`.
    ///
    /// Price and market cap must both be strictly positive.
    pub fn shares_outstanding(&self) -> ScreenResult<Shares> {
        if self.price.is_zero() {
            return Err(ScreenError::ZeroPrice);
        }
        if self.price < Decimal::ZERO {
            return Err(ScreenError::InvalidInput {
                field: "price".into(),
                reason: "Must be positive".into(),
            });
        }
        if self.market_cap.is_zero() {
            return Err(ScreenError::ZeroMarketCap);
        }
        if self.market_cap < Decimal::ZERO {
            return Err(ScreenError::InvalidInput {
                field: "market_cap".into(),
                reason: "Must be positive".into(),
            });
        }
        let shares = arith::div(self.market_cap, self.price, "share count")?;
        if shares.is_zero() {
            return Err(ScreenError::ZeroShares);
        }
        Ok(shares)
    }
}

/// Most recent cash and debt position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub cash: Money,
    /// Stored as a magnitude by convention; a negative value is flagged, not flipped
    pub debt: Money,
}

impl BalanceSheet {
    pub fn net_cash(&self) -> ScreenResult<Money> {
        dcf::net_cash(self.cash, self.debt)
    }
}
