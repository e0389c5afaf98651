use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::config::ValuationConfig;
use crate::error::ScreenError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate, Shares, ValuationWarning};
use crate::ScreenResult;

use super::arith;
use super::dcf::{calculate_dcf, DcfInput};
use super::fcf::{calculate_free_cash_flow, raise};
use super::fundamentals::{aggregate_fundamentals, AnnualBucket, QuarterlyFundamentals};
use super::growth::estimate_growth;
use super::quote::{BalanceSheet, Quote};
use super::verdict::assess;

const METHODOLOGY: &str = "3-Year Average FCF, 5-Year Projection, Gordon Growth Terminal Value";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything the engine needs to value one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockInput {
    pub symbol: String,
    /// Informational only
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub industry: String,
    pub quote: Quote,
    pub balance_sheet: BalanceSheet,
    /// Most recent quarter first
    pub quarters: Vec<QuarterlyFundamentals>,
}

/// Fully populated valuation for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockValuation {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub industry: String,

    // Quote
    pub price: Money,
    pub market_cap: Money,
    pub volume: Decimal,
    pub shares_outstanding: Shares,

    // Balance sheet
    pub cash: Money,
    pub debt: Money,
    pub net_cash: Money,

    // Annual figures, oldest first
    pub annual: [AnnualBucket; 3],
    pub fcf_by_year: [Money; 3],

    pub ebit_current_year: Money,
    pub depreciation_current_year: Money,
    pub capex_current_year: Money,
    pub fcf_current_year: Money,

    pub ebit_3yr_average: Money,
    pub depreciation_3yr_average: Money,
    pub capex_3yr_average: Money,
    pub fcf_3yr_average: Money,
    pub fcf_3yr_average_per_share: Money,

    // Growth
    pub fcf_growth_year_over_year: [Rate; 2],
    pub recent_average_fcf_growth_rate: Rate,
    pub recent_average_fcf_conservative_growth_rate: Rate,

    // DCF
    pub discount_rate: Rate,
    pub terminal_growth_rate: Rate,
    pub fcf_after_5y_conservative: Money,
    pub fcf_after_5y_aggressive: Money,
    pub terminal_value: Money,
    pub terminal_value_aggressive: Money,
    pub terminal_value_adjusted: Money,
    pub terminal_value_aggressive_adjusted: Money,
    pub dcf_target_per_share_price: Money,
    pub dcf_target_per_share_price_aggressive: Money,

    // Verdict
    pub upside_potential: Rate,
    pub is_undervalued: bool,
}

/// A symbol that could not be valued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenFailure {
    pub symbol: String,
    pub kind: String,
    pub message: String,
}

impl ScreenFailure {
    pub fn new(symbol: &str, error: &ScreenError) -> Self {
        Self {
            symbol: symbol.to_string(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for ScreenFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.symbol, self.message)
    }
}

/// A data-quality warning attached to a symbol that was still valued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolWarning {
    pub symbol: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSummary {
    pub screened: usize,
    pub valued: usize,
    pub failed: usize,
    pub undervalued: usize,
}

/// Result of screening a batch, in input order unless re-sorted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenReport {
    pub valued: Vec<StockValuation>,
    pub failures: Vec<ScreenFailure>,
    pub warnings: Vec<SymbolWarning>,
}

impl ScreenReport {
    /// Fold one symbol's outcome into the report. Failures are logged and
    /// kept; they never abort the batch.
    pub fn record(&mut self, symbol: &str, outcome: ScreenResult<ComputationOutput<StockValuation>>) {
        match outcome {
            Ok(output) => {
                for message in output.warnings {
                    self.warnings.push(SymbolWarning {
                        symbol: symbol.to_string(),
                        message,
                    });
                }
                self.valued.push(output.result);
            }
            Err(e) => {
                warn!(symbol, kind = e.kind(), "{e}... Skipping...");
                self.failures.push(ScreenFailure::new(symbol, &e));
            }
        }
    }

    pub fn summary(&self) -> ScreenSummary {
        ScreenSummary {
            screened: self.valued.len() + self.failures.len(),
            valued: self.valued.len(),
            failed: self.failures.len(),
            undervalued: self.undervalued().count(),
        }
    }

    pub fn undervalued(&self) -> impl Iterator<Item = &StockValuation> {
        self.valued.iter().filter(|v| v.is_undervalued)
    }

    /// Highest upside first; ties broken by symbol.
    pub fn sort_by_upside(&mut self) {
        self.valued.sort_by(|a, b| {
            match b.upside_potential.cmp(&a.upside_potential) {
                Ordering::Equal => a.symbol.cmp(&b.symbol),
                other => other,
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the full pipeline for one symbol.
///
/// Stages run in a fixed order (quote, aggregation, FCF, growth, DCF,
/// verdict); the first failing checkpoint discards the symbol.
pub fn value_stock(
    input: &StockInput,
    config: &ValuationConfig,
) -> ScreenResult<ComputationOutput<StockValuation>> {
    let start = Instant::now();
    let _span = info_span!("value_stock", symbol = %input.symbol).entered();
    let mut warnings: Vec<ValuationWarning> = Vec::new();

    config.validate()?;

    // --- Quote ---
    let shares_outstanding = input.quote.shares_outstanding()?;

    // --- Fundamentals ---
    let summary = aggregate_fundamentals(&input.quarters)?;

    let balance = input.balance_sheet;
    if balance.cash.is_zero() {
        return Err(ScreenError::ZeroCash);
    }
    if balance.debt < Decimal::ZERO {
        raise(&mut warnings, ValuationWarning::NegativeDebt(balance.debt));
    }
    let net_cash = balance.net_cash()?;

    // --- Free cash flow ---
    let fcf = calculate_free_cash_flow(&summary, &mut warnings)?;
    debug!(fcf_by_year = ?fcf.by_year, fcf_3yr_average = %fcf.three_year_average, "free cash flow");

    // --- Growth ---
    let growth = estimate_growth(&fcf.by_year, config.max_conservative_growth_rate)?;
    debug!(
        recent_average = %growth.recent_average,
        conservative = %growth.conservative,
        "growth estimate"
    );

    // --- DCF ---
    let dcf = calculate_dcf(
        &DcfInput {
            base_fcf: fcf.three_year_average,
            current_year_fcf: fcf.current_year(),
            conservative_growth_rate: growth.conservative,
            net_cash,
            shares_outstanding,
        },
        config,
    )?;

    // --- Verdict ---
    let verdict = assess(dcf.terminal_value_adjusted, input.quote.market_cap)?;
    let fcf_3yr_average_per_share =
        arith::div(fcf.three_year_average, shares_outstanding, "FCF per share")?;

    let current = summary.current_year();
    let valuation = StockValuation {
        symbol: input.symbol.clone(),
        name: input.name.clone(),
        sector: input.sector.clone(),
        industry: input.industry.clone(),
        price: input.quote.price,
        market_cap: input.quote.market_cap,
        volume: input.quote.volume,
        shares_outstanding,
        cash: balance.cash,
        debt: balance.debt,
        net_cash,
        annual: summary.buckets,
        fcf_by_year: fcf.by_year,
        ebit_current_year: current.ebit,
        depreciation_current_year: current.depreciation_amortization,
        capex_current_year: current.capital_expenditure,
        fcf_current_year: fcf.current_year(),
        ebit_3yr_average: summary.ebit_3yr_average(),
        depreciation_3yr_average: summary.depreciation_3yr_average(),
        capex_3yr_average: summary.capex_3yr_average(),
        fcf_3yr_average: fcf.three_year_average,
        fcf_3yr_average_per_share,
        fcf_growth_year_over_year: growth.year_over_year,
        recent_average_fcf_growth_rate: growth.recent_average,
        recent_average_fcf_conservative_growth_rate: growth.conservative,
        discount_rate: config.discount_rate,
        terminal_growth_rate: config.terminal_growth_rate,
        fcf_after_5y_conservative: dcf.fcf_after_5y_conservative,
        fcf_after_5y_aggressive: dcf.fcf_after_5y_aggressive,
        terminal_value: dcf.terminal_value,
        terminal_value_aggressive: dcf.terminal_value_aggressive,
        terminal_value_adjusted: dcf.terminal_value_adjusted,
        terminal_value_aggressive_adjusted: dcf.terminal_value_aggressive_adjusted,
        dcf_target_per_share_price: dcf.dcf_target_per_share_price,
        dcf_target_per_share_price_aggressive: dcf.dcf_target_per_share_price_aggressive,
        upside_potential: verdict.upside_potential,
        is_undervalued: verdict.is_undervalued,
    };

    info!(
        upside = %valuation.upside_potential.round_dp(4),
        undervalued = valuation.is_undervalued,
        "valued"
    );

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        METHODOLOGY,
        config,
        warnings.iter().map(ToString::to_string).collect(),
        elapsed,
        valuation,
    ))
}

/// Value every input independently.
///
/// The configuration is checked once up front; an invalid configuration is
/// returned as an error before any symbol is processed. Per-symbol failures
/// are collected in the report.
pub fn screen(inputs: &[StockInput], config: &ValuationConfig) -> ScreenResult<ScreenReport> {
    config.validate()?;

    let mut report = ScreenReport::default();
    for input in inputs {
        info!(symbol = %input.symbol, "Processing {}...", input.symbol);
        report.record(&input.symbol, isolate(|| value_stock(input, config)));
    }

    let summary = report.summary();
    info!(
        screened = summary.screened,
        valued = summary.valued,
        failed = summary.failed,
        undervalued = summary.undervalued,
        "screen complete"
    );
    Ok(report)
}

/// Run one symbol's pipeline, turning a panic into `Unexpected` so the
/// rest of the batch still runs.
pub fn isolate<T>(pipeline: impl FnOnce() -> ScreenResult<T>) -> ScreenResult<T> {
    panic::catch_unwind(AssertUnwindSafe(pipeline))
        .unwrap_or_else(|payload| Err(ScreenError::Unexpected(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// Quarters (newest first) whose annual sums are EBIT [100, 110, 121],
    /// D&A 20 and capex 10 per year.
    fn growing_quarters() -> Vec<QuarterlyFundamentals> {
        let yearly_ebit = [dec!(121), dec!(110), dec!(100)];
        yearly_ebit
            .iter()
            .flat_map(|ebit| {
                (0..4).map(move |_| QuarterlyFundamentals::new(ebit / dec!(4), dec!(5), dec!(2.5)))
            })
            .collect()
    }

    fn sample_input() -> StockInput {
        StockInput {
            symbol: "ACME".into(),
            name: "Acme Corp".into(),
            sector: "Industrials".into(),
            industry: "Machinery".into(),
            quote: Quote {
                price: dec!(10),
                market_cap: dec!(1000),
                volume: dec!(5000),
            },
            balance_sheet: BalanceSheet {
                cash: dec!(300),
                debt: dec!(100),
            },
            quarters: growing_quarters(),
        }
    }

    #[test]
    fn test_value_stock_end_to_end() {
        let out = value_stock(&sample_input(), &ValuationConfig::default()).unwrap();
        let v = &out.result;

        assert_eq!(v.fcf_by_year, [dec!(90), dec!(100), dec!(111)]);
        assert_eq!(v.shares_outstanding, dec!(100));
        assert_eq!(v.net_cash, dec!(200));
        assert!((v.recent_average_fcf_conservative_growth_rate - dec!(0.0528)).abs() < dec!(0.0001));
        assert_eq!(v.terminal_value_adjusted, v.terminal_value + dec!(200));
        assert_eq!(v.is_undervalued, v.terminal_value_adjusted > dec!(1000));
        assert_eq!(v.ebit_current_year, dec!(121));
        assert_eq!(v.fcf_current_year, dec!(111));
        assert!(out.warnings.is_empty());
        assert_eq!(out.methodology, METHODOLOGY);
    }

    #[test]
    fn test_zero_cash_rejected() {
        let mut input = sample_input();
        input.balance_sheet.cash = Decimal::ZERO;
        assert_eq!(
            value_stock(&input, &ValuationConfig::default()).unwrap_err(),
            ScreenError::ZeroCash
        );
    }

    #[test]
    fn test_negative_debt_warns_and_is_treated_as_magnitude() {
        let mut input = sample_input();
        input.balance_sheet.debt = dec!(-100);
        let out = value_stock(&input, &ValuationConfig::default()).unwrap();
        assert_eq!(out.result.net_cash, dec!(200));
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].starts_with("Debt is negative"));
    }

    #[test]
    fn test_screen_collects_failures_without_aborting() {
        let mut bad = sample_input();
        bad.symbol = "BAD".into();
        bad.quote.price = Decimal::ZERO;
        let inputs = vec![bad, sample_input()];

        let report = screen(&inputs, &ValuationConfig::default()).unwrap();
        assert_eq!(report.valued.len(), 1);
        assert_eq!(report.valued[0].symbol, "ACME");
        assert_eq!(
            report.failures,
            vec![ScreenFailure {
                symbol: "BAD".into(),
                kind: "ZeroPrice".into(),
                message: "Price is zero".into(),
            }]
        );
        assert_eq!(report.failures[0].to_string(), "BAD: Price is zero");
    }

    #[test]
    fn test_screen_rejects_bad_config_up_front() {
        let cfg = ValuationConfig::default().with_terminal_growth_rate(dec!(0.09));
        let err = screen(&[sample_input()], &cfg).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_identity_carried_through() {
        let v = value_stock(&sample_input(), &ValuationConfig::default())
            .unwrap()
            .result;
        assert_eq!(v.sector, "Industrials");
        assert_eq!(v.industry, "Machinery");
    }

    #[test]
    fn test_isolate_turns_panic_into_unexpected() {
        let err = isolate::<()>(|| panic!("feed went away")).unwrap_err();
        assert_eq!(err, ScreenError::Unexpected("feed went away".into()));
        assert_eq!(err.kind(), "UnexpectedFailure");

        let symbol = "ACME";
        let err = isolate::<()>(|| panic!("{symbol}: bad record")).unwrap_err();
        assert_eq!(err, ScreenError::Unexpected("ACME: bad record".into()));

        assert_eq!(isolate(|| Ok(7)), Ok(7));
    }

    /// Shared buffer the test subscriber writes formatted events into.
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_warning_logged_even_when_symbol_later_fails() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut input = sample_input();
        input.balance_sheet.debt = dec!(-100);
        // oldest-year FCF of zero fails growth after the debt check
        for q in &mut input.quarters[8..] {
            q.ebit = dec!(2.5);
        }

        let err = tracing::subscriber::with_default(subscriber, || {
            value_stock(&input, &ValuationConfig::default()).unwrap_err()
        });
        assert_eq!(err, ScreenError::UndefinedGrowthRate { year: 0 });

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("Debt is negative (-100)"), "{logs}");
        assert!(logs.contains("ACME"), "{logs}");
    }

    #[test]
    fn test_sort_by_upside() {
        let mut report = ScreenReport::default();
        for (symbol, upside) in [("B", dec!(0.1)), ("A", dec!(0.1)), ("C", dec!(0.5))] {
            let mut v = value_stock(&sample_input(), &ValuationConfig::default())
                .unwrap()
                .result;
            v.symbol = symbol.into();
            v.upside_potential = upside;
            report.valued.push(v);
        }
        report.sort_by_upside();
        let order: Vec<_> = report.valued.iter().map(|v| v.symbol.as_str()).collect();
        assert_eq!(order, vec!["C", "A", "B"]);
    }
}
