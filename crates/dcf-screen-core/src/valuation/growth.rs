use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ScreenError;
use crate::types::{Money, Rate};
use crate::ScreenResult;

use super::arith;
use super::fundamentals::YEARS_OF_HISTORY;

/// Recent growth above this is too aggressive to extrapolate; the configured
/// cap is used instead.
pub const AGGRESSIVE_GROWTH_THRESHOLD: Rate = dec!(0.30);

/// Year-over-year FCF growth and the dampened projection rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthEstimate {
    /// Growth into year 1 and into year 2 (current)
    pub year_over_year: [Rate; YEARS_OF_HISTORY - 1],
    pub recent_average: Rate,
    pub conservative: Rate,
}

/// `current / previous - 1`. A zero `previous` is an error, never 0%.
///
/// `previous_year` is the bucket index of the divisor, reported on failure.
/// A near-zero `previous` can push the ratio out of range, which is `Overflow`.
pub fn year_over_year_growth(
    previous: Money,
    current: Money,
    previous_year: usize,
) -> ScreenResult<Rate> {
    if previous.is_zero() {
        return Err(ScreenError::UndefinedGrowthRate {
            year: previous_year,
        });
    }
    let ratio = arith::div(current, previous, "growth rate")?;
    arith::sub(ratio, Decimal::ONE, "growth rate")
}

/// Dampen recent growth so short-term trends are not over-extrapolated.
///
/// Above the aggressive threshold the configured cap is used; positive growth
/// is halved (and still held to the cap); shrinkage passes through unchanged.
pub fn conservative_growth_rate(recent_average: Rate, max_conservative: Rate) -> Rate {
    if recent_average > AGGRESSIVE_GROWTH_THRESHOLD {
        max_conservative
    } else if recent_average > Decimal::ZERO {
        (recent_average / dec!(2)).min(max_conservative)
    } else {
        recent_average
    }
}

/// Estimate growth from annual FCF ordered oldest to current.
pub fn estimate_growth(
    fcf_by_year: &[Money; YEARS_OF_HISTORY],
    max_conservative: Rate,
) -> ScreenResult<GrowthEstimate> {
    let growth_1 = year_over_year_growth(fcf_by_year[0], fcf_by_year[1], 0)?;
    let growth_2 = year_over_year_growth(fcf_by_year[1], fcf_by_year[2], 1)?;
    let recent_average = arith::add(growth_1, growth_2, "average growth rate")? / dec!(2);

    Ok(GrowthEstimate {
        year_over_year: [growth_1, growth_2],
        recent_average,
        conservative: conservative_growth_rate(recent_average, max_conservative),
    })
}
