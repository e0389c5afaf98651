//! Checked decimal arithmetic for the valuation pipeline.
//!
//! `Decimal`'s operators panic when a result leaves the 96-bit range. Every
//! stage that combines provider figures goes through these instead so an
//! extreme input fails its own symbol with `Overflow`.

use rust_decimal::Decimal;

use crate::error::ScreenError;
use crate::ScreenResult;

fn overflow(context: &str) -> ScreenError {
    ScreenError::Overflow {
        context: context.to_string(),
    }
}

pub fn add(a: Decimal, b: Decimal, context: &str) -> ScreenResult<Decimal> {
    a.checked_add(b).ok_or_else(|| overflow(context))
}

pub fn sub(a: Decimal, b: Decimal, context: &str) -> ScreenResult<Decimal> {
    a.checked_sub(b).ok_or_else(|| overflow(context))
}

pub fn mul(a: Decimal, b: Decimal, context: &str) -> ScreenResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| overflow(context))
}

/// Callers check for a zero divisor first; a `None` here is range overflow.
pub fn div(a: Decimal, b: Decimal, context: &str) -> ScreenResult<Decimal> {
    a.checked_div(b).ok_or_else(|| overflow(context))
}

pub fn sum<I>(values: I, context: &str) -> ScreenResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| add(acc, v, context))
}
