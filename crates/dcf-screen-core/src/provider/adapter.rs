use rust_decimal::Decimal;

use crate::error::{DataSeries, ScreenError};
use crate::types::Money;
use crate::valuation::arith;
use crate::valuation::fundamentals::{ensure_history, QuarterlyFundamentals, REQUIRED_QUARTERS};
use crate::valuation::quote::{BalanceSheet, Quote};
use crate::valuation::StockInput;
use crate::ScreenResult;

use super::payload::{CashFlowRecord, FundamentalsRecord, QuotePayload};
use super::source::Listing;

/// First non-null of close, exchange close and latest trade price.
pub fn resolve_price(quote: &QuotePayload) -> ScreenResult<Money> {
    quote
        .close
        .or(quote.iex_close)
        .or(quote.latest_price)
        .ok_or(ScreenError::MissingQuote)
}

/// Map a quote payload onto the engine's quote and check its denominators.
pub fn adapt_quote(quote: &QuotePayload) -> ScreenResult<Quote> {
    let price = resolve_price(quote)?;
    let market_cap = quote.market_cap.ok_or(ScreenError::ZeroMarketCap)?;
    let adapted = Quote {
        price,
        market_cap,
        volume: quote.avg_total_volume.unwrap_or(Decimal::ZERO),
    };
    adapted.shares_outstanding()?;
    Ok(adapted)
}

/// Cash and debt from the most recent fundamentals record.
///
/// Each debt term is taken as a magnitude so that a provider's negative
/// liability never turns into cash through `cash - debt`.
pub fn adapt_balance_sheet(latest: &FundamentalsRecord) -> ScreenResult<BalanceSheet> {
    let cash: Money = arith::sum(
        [
            latest.assets_current_cash,
            latest.cash_long_term,
            latest.cash_operating,
        ]
        .into_iter()
        .flatten(),
        "cash",
    )?;

    let debt: Money = arith::sum(
        [
            latest.liabilities_non_current_debt,
            latest.debt_short_term,
            latest.debt_financial,
        ]
        .into_iter()
        .flatten()
        .map(|d| d.abs()),
        "debt",
    )?;

    Ok(BalanceSheet { cash, debt })
}

/// Merge the two quarterly series into the engine's per-quarter records.
pub fn adapt_quarters(
    fundamentals: &[FundamentalsRecord],
    cash_flow: &[CashFlowRecord],
) -> ScreenResult<Vec<QuarterlyFundamentals>> {
    ensure_history(fundamentals.len(), DataSeries::Fundamentals)?;
    ensure_history(cash_flow.len(), DataSeries::CashFlow)?;

    fundamentals
        .iter()
        .zip(cash_flow)
        .take(REQUIRED_QUARTERS)
        .enumerate()
        .map(|(quarter, (f, c))| -> ScreenResult<QuarterlyFundamentals> {
            QuarterlyFundamentals::from_reported(
                required(f.ebit_reported, "ebitReported", quarter)?,
                required(
                    f.depreciation_and_amortization_cash_flow,
                    "depreciationAndAmortizationCashFlow",
                    quarter,
                )?,
                required(
                    f.expenses_depreciation_and_amortization,
                    "expensesDepreciationAndAmortization",
                    quarter,
                )?,
                required(c.capital_expenditures, "capitalExpenditures", quarter)?,
            )
        })
        .collect()
}

/// Assemble one symbol's engine input from raw provider payloads.
///
/// Checkpoints run in fetch order: quote, fundamentals history, cash-flow
/// history, then per-quarter field presence. Identity comes from `listing`.
pub fn build_stock_input(
    listing: &Listing,
    quote: &QuotePayload,
    fundamentals: &[FundamentalsRecord],
    cash_flow: &[CashFlowRecord],
) -> ScreenResult<StockInput> {
    let quote = adapt_quote(quote)?;
    ensure_history(fundamentals.len(), DataSeries::Fundamentals)?;
    let balance_sheet = adapt_balance_sheet(&fundamentals[0])?;
    let quarters = adapt_quarters(fundamentals, cash_flow)?;

    Ok(StockInput {
        symbol: listing.symbol.clone(),
        name: listing.name.clone(),
        sector: listing.sector.clone(),
        industry: listing.industry.clone(),
        quote,
        balance_sheet,
        quarters,
    })
}

fn required(value: Option<Decimal>, field: &str, quarter: usize) -> ScreenResult<Decimal> {
    value.ok_or_else(|| ScreenError::InvalidInput {
        field: format!("{field}[{quarter}]"),
        reason: "Missing from provider payload".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fundamentals_record(ebit: Decimal) -> FundamentalsRecord {
        FundamentalsRecord {
            ebit_reported: Some(ebit),
            assets_current_cash: Some(dec!(100)),
            cash_long_term: Some(dec!(20)),
            cash_operating: None,
            liabilities_non_current_debt: Some(dec!(-40)),
            debt_short_term: Some(dec!(10)),
            debt_financial: None,
            depreciation_and_amortization_cash_flow: Some(dec!(-3)),
            expenses_depreciation_and_amortization: Some(dec!(2)),
        }
    }

    fn capex_record(capex: Decimal) -> CashFlowRecord {
        CashFlowRecord {
            capital_expenditures: Some(capex),
        }
    }

    fn priced(
        close: Option<Decimal>,
        iex: Option<Decimal>,
        latest: Option<Decimal>,
    ) -> QuotePayload {
        QuotePayload {
            close,
            iex_close: iex,
            latest_price: latest,
            market_cap: Some(dec!(1000)),
            avg_total_volume: Some(dec!(50)),
            ..Default::default()
        }
    }

    #[test]
    fn test_price_precedence() {
        let all = priced(Some(dec!(1)), Some(dec!(2)), Some(dec!(3)));
        assert_eq!(resolve_price(&all).unwrap(), dec!(1));
        let no_close = priced(None, Some(dec!(2)), Some(dec!(3)));
        assert_eq!(resolve_price(&no_close).unwrap(), dec!(2));
        let latest_only = priced(None, None, Some(dec!(3)));
        assert_eq!(resolve_price(&latest_only).unwrap(), dec!(3));
        assert_eq!(
            resolve_price(&priced(None, None, None)),
            Err(ScreenError::MissingQuote)
        );
    }

    #[test]
    fn test_zero_close_wins_over_later_fields() {
        // precedence is by presence, not by value
        let q = priced(Some(Decimal::ZERO), Some(dec!(2)), None);
        assert_eq!(adapt_quote(&q), Err(ScreenError::ZeroPrice));
    }

    #[test]
    fn test_missing_market_cap() {
        let mut q = priced(Some(dec!(5)), None, None);
        q.market_cap = None;
        assert_eq!(adapt_quote(&q), Err(ScreenError::ZeroMarketCap));
    }

    #[test]
    fn test_balance_sheet_debt_is_magnitude() {
        let bs = adapt_balance_sheet(&fundamentals_record(dec!(1))).unwrap();
        assert_eq!(bs.cash, dec!(120));
        assert_eq!(bs.debt, dec!(50));
        assert_eq!(bs.net_cash().unwrap(), dec!(70));
    }

    #[test]
    fn test_balance_sheet_out_of_range() {
        let mut rec = fundamentals_record(dec!(1));
        rec.assets_current_cash = Some(Decimal::MAX);
        rec.cash_operating = Some(Decimal::MAX);
        assert_eq!(
            adapt_balance_sheet(&rec),
            Err(ScreenError::Overflow {
                context: "cash".into()
            })
        );
    }

    #[test]
    fn test_quarters_merge_and_normalize() {
        let f: Vec<_> = (0..12).map(|_| fundamentals_record(dec!(7))).collect();
        let c: Vec<_> = (0..12).map(|_| capex_record(dec!(-4))).collect();
        let quarters = adapt_quarters(&f, &c).unwrap();
        assert_eq!(quarters.len(), 12);
        assert_eq!(quarters[0], QuarterlyFundamentals::new(dec!(7), dec!(5), dec!(4)));
    }

    #[test]
    fn test_short_series_reported_per_source() {
        let f: Vec<_> = (0..12).map(|_| fundamentals_record(dec!(7))).collect();
        let c: Vec<_> = (0..11).map(|_| capex_record(dec!(4))).collect();
        assert_eq!(
            adapt_quarters(&f, &c),
            Err(ScreenError::InsufficientHistory {
                series: DataSeries::CashFlow,
                required: 12,
                actual: 11,
            })
        );
        assert_eq!(
            adapt_quarters(&f[..11], &c),
            Err(ScreenError::InsufficientHistory {
                series: DataSeries::Fundamentals,
                required: 12,
                actual: 11,
            })
        );
    }

    #[test]
    fn test_missing_field_names_quarter() {
        let mut f: Vec<_> = (0..12).map(|_| fundamentals_record(dec!(7))).collect();
        f[3].ebit_reported = None;
        let c: Vec<_> = (0..12).map(|_| capex_record(dec!(4))).collect();
        match adapt_quarters(&f, &c) {
            Err(ScreenError::InvalidInput { field, .. }) => assert_eq!(field, "ebitReported[3]"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_build_stock_input_checks_quote_first() {
        let q = priced(None, None, None);
        let listing = Listing {
            symbol: "X".into(),
            name: "X Corp".into(),
            ..Default::default()
        };
        assert_eq!(
            build_stock_input(&listing, &q, &[], &[]).unwrap_err(),
            ScreenError::MissingQuote
        );
    }
}
