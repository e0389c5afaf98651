use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ScreenError;
use crate::types::{Money, Rate};
use crate::ScreenResult;

use super::arith;

/// Outcome of comparing model value to the market's price for the company.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub is_undervalued: bool,
    /// Return if market cap moved to the model value (0.25 = 25%)
    pub upside_potential: Rate,
}

/// Judge a symbol on its conservative, net-cash-adjusted terminal value.
pub fn assess(terminal_value_adjusted: Money, market_cap: Money) -> ScreenResult<Verdict> {
    if market_cap.is_zero() {
        return Err(ScreenError::ZeroMarketCap);
    }
    let ratio = arith::div(terminal_value_adjusted, market_cap, "upside potential")?;
    Ok(Verdict {
        is_undervalued: terminal_value_adjusted > market_cap,
        upside_potential: arith::sub(ratio, Decimal::ONE, "upside potential")?,
    })
}
