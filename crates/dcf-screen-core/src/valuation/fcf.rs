use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ScreenError;
use crate::types::{Money, ValuationWarning};
use crate::ScreenResult;

use super::arith;
use super::fundamentals::{FundamentalsSummary, YEARS_OF_HISTORY};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Free cash flow per annual bucket (oldest first) and the 3-year average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeCashFlowSummary {
    pub by_year: [Money; YEARS_OF_HISTORY],
    pub three_year_average: Money,
}

impl FreeCashFlowSummary {
    pub fn current_year(&self) -> Money {
        self.by_year[YEARS_OF_HISTORY - 1]
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// FCF = EBIT - D&A + CapEx.
///
/// Note the signs: depreciation is charged and capex credited back, the
/// reverse of the textbook NOPAT + D&A - CapEx.
pub fn free_cash_flow(ebit: Money, depreciation: Money, capex: Money) -> ScreenResult<Money> {
    let charged = arith::sub(ebit, depreciation, "free cash flow")?;
    arith::add(charged, capex, "free cash flow")
}

/// Validate the 3-year totals and derive per-year and average FCF.
///
/// Zero totals are treated as missing data and reject the symbol. Negative
/// depreciation or capex totals are logged, pushed to `warnings`, and
/// processing continues with the value as-is.
pub fn calculate_free_cash_flow(
    summary: &FundamentalsSummary,
    warnings: &mut Vec<ValuationWarning>,
) -> ScreenResult<FreeCashFlowSummary> {
    if summary.total_ebit.is_zero() {
        return Err(ScreenError::ZeroEbit3Yr);
    }
    if summary.total_depreciation.is_zero() {
        return Err(ScreenError::ZeroDepreciation3Yr);
    }
    if summary.total_depreciation < Decimal::ZERO {
        raise(
            warnings,
            ValuationWarning::NegativeDepreciation(summary.total_depreciation),
        );
    }
    if summary.total_capex.is_zero() {
        return Err(ScreenError::ZeroCapEx3Yr);
    }
    if summary.total_capex < Decimal::ZERO {
        raise(warnings, ValuationWarning::NegativeCapEx(summary.total_capex));
    }

    let mut by_year = [Decimal::ZERO; YEARS_OF_HISTORY];
    for (fcf, b) in by_year.iter_mut().zip(&summary.buckets) {
        *fcf = free_cash_flow(b.ebit, b.depreciation_amortization, b.capital_expenditure)?;
    }

    // Average the combined 3-year figure, not the per-year results.
    let three_year_average = free_cash_flow(
        summary.total_ebit,
        summary.total_depreciation,
        summary.total_capex,
    )? / Decimal::from(YEARS_OF_HISTORY as u64);

    Ok(FreeCashFlowSummary {
        by_year,
        three_year_average,
    })
}

/// Log a data-quality warning when it is found and keep it for the report.
pub(crate) fn raise(warnings: &mut Vec<ValuationWarning>, warning: ValuationWarning) {
    warn!("{warning}");
    warnings.push(warning);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
