//! Reduction of twelve quarterly fundamental records into three annual
//! buckets and 3-year totals.
//!
//! Quarter index 0 is the most recent quarter; indices increase going back
//! in time. Bucket 0 is the oldest full year (quarters 8-11), bucket 2 the
//! most recent (quarters 0-3).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DataSeries, ScreenError};
use crate::types::Money;
use crate::ScreenResult;

use super::arith;

pub const QUARTERS_PER_YEAR: usize = 4;
pub const YEARS_OF_HISTORY: usize = 3;
pub const REQUIRED_QUARTERS: usize = QUARTERS_PER_YEAR * YEARS_OF_HISTORY;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One fiscal quarter of the figures the engine needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyFundamentals {
    /// Earnings before interest and taxes, as reported
    pub ebit: Money,
    /// Depreciation & amortisation (magnitude)
    pub depreciation_amortization: Money,
    /// Capital expenditure (magnitude)
    pub capital_expenditure: Money,
}

impl QuarterlyFundamentals {
    pub fn new(ebit: Money, depreciation_amortization: Money, capital_expenditure: Money) -> Self {
        Self {
            ebit,
            depreciation_amortization,
            capital_expenditure,
        }
    }

    /// Build from provider fields. The two D&A sources are summed as
    /// magnitudes because providers disagree on their sign.
    pub fn from_reported(
        ebit: Money,
        depreciation_cash_flow: Money,
        depreciation_expense: Money,
        capital_expenditure: Money,
    ) -> ScreenResult<Self> {
        Ok(Self {
            ebit,
            depreciation_amortization: arith::add(
                depreciation_cash_flow.abs(),
                depreciation_expense.abs(),
                "quarterly depreciation",
            )?,
            capital_expenditure: capital_expenditure.abs(),
        })
    }
}

/// Sum of four consecutive quarters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnualBucket {
    pub ebit: Money,
    pub depreciation_amortization: Money,
    pub capital_expenditure: Money,
}

/// Annual buckets (oldest first) plus 3-year totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsSummary {
    pub buckets: [AnnualBucket; YEARS_OF_HISTORY],
    pub total_ebit: Money,
    pub total_depreciation: Money,
    pub total_capex: Money,
}

impl FundamentalsSummary {
    /// Most recent full year.
    pub fn current_year(&self) -> &AnnualBucket {
        &self.buckets[YEARS_OF_HISTORY - 1]
    }

    pub fn ebit_3yr_average(&self) -> Money {
        self.total_ebit / years_divisor()
    }

    pub fn depreciation_3yr_average(&self) -> Money {
        self.total_depreciation / years_divisor()
    }

    pub fn capex_3yr_average(&self) -> Money {
        self.total_capex / years_divisor()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Aggregate the 12 most recent quarters into annual buckets and totals.
///
/// Fewer than 12 records is `InsufficientHistory`. Any records beyond the
/// first 12 are older than the 3-year window and are ignored.
///
/// The provider adapter checks each source series first, so the `Quarterly`
/// shortfall only reaches callers that build `StockInput` themselves.
pub fn aggregate_fundamentals(
    quarters: &[QuarterlyFundamentals],
) -> ScreenResult<FundamentalsSummary> {
    ensure_history(quarters.len(), DataSeries::Quarterly)?;

    let window = &quarters[..REQUIRED_QUARTERS];
    let mut buckets = [AnnualBucket::default(); YEARS_OF_HISTORY];

    for (year_back, chunk) in window.chunks_exact(QUARTERS_PER_YEAR).enumerate() {
        // chunk 0 holds the newest quarters, so it fills the last bucket
        let bucket = &mut buckets[YEARS_OF_HISTORY - 1 - year_back];
        bucket.ebit = arith::sum(chunk.iter().map(|q| q.ebit), "annual EBIT")?;
        bucket.depreciation_amortization = arith::sum(
            chunk.iter().map(|q| q.depreciation_amortization.abs()),
            "annual depreciation",
        )?;
        bucket.capital_expenditure = arith::sum(
            chunk.iter().map(|q| q.capital_expenditure.abs()),
            "annual capex",
        )?;
    }

    let total_ebit = arith::sum(buckets.iter().map(|b| b.ebit), "3-year EBIT")?;
    let total_depreciation = arith::sum(
        buckets.iter().map(|b| b.depreciation_amortization),
        "3-year depreciation",
    )?;
    let total_capex = arith::sum(buckets.iter().map(|b| b.capital_expenditure), "3-year capex")?;

    Ok(FundamentalsSummary {
        buckets,
        total_ebit,
        total_depreciation,
        total_capex,
    })
}

/// Require at least a full 3-year window of quarters for `series`.
pub fn ensure_history(actual: usize, series: DataSeries) -> ScreenResult<()> {
    if actual < REQUIRED_QUARTERS {
        return Err(ScreenError::InsufficientHistory {
            series,
            required: REQUIRED_QUARTERS,
            actual,
        });
    }
    Ok(())
}

fn years_divisor() -> Decimal {
    Decimal::from(YEARS_OF_HISTORY as u64)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// Quarter i (0 = newest) gets EBIT = i + 1 so bucket sums are easy to check.
    fn indexed_quarters(n: usize) -> Vec<QuarterlyFundamentals> {
        (0..n)
            .map(|i| {
                QuarterlyFundamentals::new(
                    Decimal::from(i as u64 + 1),
                    dec!(2),
                    dec!(1),
                )
            })
            .collect()
    }

    #[test]
    fn test_bucket_ordering() {
        let summary = aggregate_fundamentals(&indexed_quarters(12)).unwrap();
        // oldest: quarters 8..=11 -> 9 + 10 + 11 + 12
        assert_eq!(summary.buckets[0].ebit, dec!(42));
        // middle: quarters 4..=7 -> 5 + 6 + 7 + 8
        assert_eq!(summary.buckets[1].ebit, dec!(26));
        // current: quarters 0..=3 -> 1 + 2 + 3 + 4
        assert_eq!(summary.buckets[2].ebit, dec!(10));
        assert_eq!(summary.current_year().ebit, dec!(10));
        assert_eq!(summary.total_ebit, dec!(78));
        assert_eq!(summary.total_depreciation, dec!(24));
        assert_eq!(summary.total_capex, dec!(12));
    }

    #[test]
    fn test_da_and_capex_absolute_valued_ebit_not() {
        let quarters: Vec<_> = (0..12)
            .map(|_| QuarterlyFundamentals::new(dec!(-5), dec!(-3), dec!(-2)))
            .collect();
        let summary = aggregate_fundamentals(&quarters).unwrap();
        assert_eq!(summary.total_ebit, dec!(-60));
        assert_eq!(summary.total_depreciation, dec!(36));
        assert_eq!(summary.total_capex, dec!(24));
    }

    #[test]
    fn test_from_reported_sums_magnitudes() {
        let q =
            QuarterlyFundamentals::from_reported(dec!(10), dec!(-4), dec!(3), dec!(-7)).unwrap();
        assert_eq!(q.ebit, dec!(10));
        assert_eq!(q.depreciation_amortization, dec!(7));
        assert_eq!(q.capital_expenditure, dec!(7));
    }

    #[test]
    fn test_totals_out_of_range() {
        let mut quarters = indexed_quarters(12);
        quarters[0].ebit = Decimal::MAX;
        quarters[1].ebit = Decimal::MAX;
        let err = aggregate_fundamentals(&quarters).unwrap_err();
        assert_eq!(
            err,
            ScreenError::Overflow {
                context: "annual EBIT".into()
            }
        );
    }

    #[test]
    fn test_eleven_quarters_rejected() {
        let err = aggregate_fundamentals(&indexed_quarters(11)).unwrap_err();
        assert_eq!(
            err,
            ScreenError::InsufficientHistory {
                series: DataSeries::Quarterly,
                required: 12,
                actual: 11,
            }
        );
    }

    #[test]
    fn test_extra_quarters_ignored() {
        let twelve = aggregate_fundamentals(&indexed_quarters(12)).unwrap();
        let sixteen = aggregate_fundamentals(&indexed_quarters(16)).unwrap();
        assert_eq!(twelve, sixteen);
    }

    #[test]
    fn test_three_year_averages() {
        let summary = aggregate_fundamentals(&indexed_quarters(12)).unwrap();
        assert_eq!(summary.ebit_3yr_average(), dec!(26));
        assert_eq!(summary.depreciation_3yr_average(), dec!(8));
        assert_eq!(summary.capex_3yr_average(), dec!(4));
    }
}
