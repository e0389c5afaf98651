use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::ValuationConfig;
use crate::error::ScreenError;
use crate::types::{Money, Rate, Shares};
use crate::ScreenResult;

use super::arith;

/// Years of growth applied before the terminal value is taken.
pub const PROJECTION_YEARS: u32 = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Inputs to the single-stage terminal-value model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfInput {
    /// 3-year-average FCF (conservative path base)
    pub base_fcf: Money,
    /// Most recent year's FCF (aggressive path base)
    pub current_year_fcf: Money,
    /// Dampened growth rate, used for both paths
    pub conservative_growth_rate: Rate,
    /// Cash minus the magnitude of debt
    pub net_cash: Money,
    pub shares_outstanding: Shares,
}

/// Terminal values for both growth bases, raw and adjusted for net cash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfOutput {
    pub fcf_after_5y_conservative: Money,
    pub fcf_after_5y_aggressive: Money,
    pub terminal_value: Money,
    pub terminal_value_aggressive: Money,
    pub terminal_value_adjusted: Money,
    pub terminal_value_aggressive_adjusted: Money,
    pub dcf_target_per_share_price: Money,
    pub dcf_target_per_share_price_aggressive: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project FCF five years out at the conservative rate, capitalise it with
/// the Gordon growth formula, add net cash, and divide by shares.
///
/// The aggressive path differs only in its base (current-year FCF); it
/// grows at the same conservative rate.
pub fn calculate_dcf(input: &DcfInput, config: &ValuationConfig) -> ScreenResult<DcfOutput> {
    if input.shares_outstanding.is_zero() {
        return Err(ScreenError::ZeroShares);
    }

    let fcf_after_5y_conservative = project_free_cash_flow(
        input.base_fcf,
        input.conservative_growth_rate,
        PROJECTION_YEARS,
    )?;
    let fcf_after_5y_aggressive = project_free_cash_flow(
        input.current_year_fcf,
        input.conservative_growth_rate,
        PROJECTION_YEARS,
    )?;

    let tv_conservative = terminal_value(fcf_after_5y_conservative, config)?;
    let tv_aggressive = terminal_value(fcf_after_5y_aggressive, config)?;

    let terminal_value_adjusted =
        arith::add(tv_conservative, input.net_cash, "adjusted terminal value")?;
    let terminal_value_aggressive_adjusted =
        arith::add(tv_aggressive, input.net_cash, "adjusted terminal value")?;
    let dcf_target_per_share_price = arith::div(
        terminal_value_adjusted,
        input.shares_outstanding,
        "per-share target",
    )?;
    let dcf_target_per_share_price_aggressive = arith::div(
        terminal_value_aggressive_adjusted,
        input.shares_outstanding,
        "per-share target",
    )?;

    Ok(DcfOutput {
        fcf_after_5y_conservative,
        fcf_after_5y_aggressive,
        terminal_value: tv_conservative,
        terminal_value_aggressive: tv_aggressive,
        terminal_value_adjusted,
        terminal_value_aggressive_adjusted,
        dcf_target_per_share_price,
        dcf_target_per_share_price_aggressive,
    })
}

/// `base * (1 + growth)^years`, in exact decimal arithmetic.
pub fn project_free_cash_flow(base: Money, growth: Rate, years: u32) -> ScreenResult<Money> {
    let factor = compound_factor(growth, years)?;
    arith::mul(base, factor, "FCF projection")
}

/// Gordon growth: `fcf * (1 + g) / (r - g)`.
pub fn terminal_value(fcf: Money, config: &ValuationConfig) -> ScreenResult<Money> {
    let spread = config.capitalization_rate()?;
    let step = arith::add(Decimal::ONE, config.terminal_growth_rate, "terminal value")?;
    let grown = arith::mul(fcf, step, "terminal value")?;
    arith::div(grown, spread, "terminal value")
}

/// Cash minus the magnitude of debt, whatever sign debt was stored with.
pub fn net_cash(cash: Money, debt: Money) -> ScreenResult<Money> {
    arith::sub(cash, debt.abs(), "net cash")
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// `(1 + rate)^years` via iterative multiplication.
fn compound_factor(rate: Rate, years: u32) -> ScreenResult<Decimal> {
    let step = arith::add(Decimal::ONE, rate, "growth compounding")?;
    let mut factor = Decimal::ONE;
    for _ in 0..years {
        factor = arith::mul(factor, step, "growth compounding")?;
    }
    Ok(factor)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
