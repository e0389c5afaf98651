use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ValuationConfig;
use crate::error::ScreenError;
use crate::valuation::fundamentals::REQUIRED_QUARTERS;
use crate::valuation::screener::isolate;
use crate::valuation::{value_stock, ScreenReport, StockInput};
use crate::ScreenResult;

use super::adapter::build_stock_input;
use super::payload::{CashFlowRecord, FundamentalsRecord, QuotePayload, SymbolSnapshot};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One entry of the screening universe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(alias = "Symbol")]
    pub symbol: String,
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Sector")]
    pub sector: String,
    #[serde(default, alias = "Industry")]
    pub industry: String,
}

/// Anything that can supply the three payloads the adapter needs.
///
/// Series are returned most recent quarter first. An implementation may
/// return fewer records than asked for; the adapter reports the shortfall.
pub trait MarketDataSource {
    fn quote(&self, symbol: &str) -> ScreenResult<QuotePayload>;

    fn fundamentals(&self, symbol: &str, quarters: usize)
        -> ScreenResult<Vec<FundamentalsRecord>>;

    fn cash_flow(&self, symbol: &str, quarters: usize) -> ScreenResult<Vec<CashFlowRecord>>;
}

/// In-memory source backed by previously fetched snapshots.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    snapshots: Vec<SymbolSnapshot>,
    index: HashMap<String, usize>,
}

impl SnapshotSource {
    /// Later snapshots for the same symbol replace earlier ones in lookups;
    /// listing order follows first appearance.
    pub fn new(snapshots: Vec<SymbolSnapshot>) -> Self {
        let mut index = HashMap::with_capacity(snapshots.len());
        for (i, snap) in snapshots.iter().enumerate() {
            index.insert(snap.symbol.clone(), i);
        }
        Self { snapshots, index }
    }

    /// Parse a JSON array of snapshots.
    pub fn from_json(json: &str) -> ScreenResult<Self> {
        let snapshots: Vec<SymbolSnapshot> = serde_json::from_str(json)?;
        Ok(Self::new(snapshots))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The universe described by the snapshots, one entry per symbol.
    pub fn listings(&self) -> Vec<Listing> {
        let mut seen = HashSet::new();
        self.snapshots
            .iter()
            .filter(|s| seen.insert(s.symbol.as_str()))
            .map(SymbolSnapshot::listing)
            .collect()
    }

    fn get(&self, symbol: &str) -> Option<&SymbolSnapshot> {
        self.index.get(symbol).map(|&i| &self.snapshots[i])
    }
}

impl MarketDataSource for SnapshotSource {
    fn quote(&self, symbol: &str) -> ScreenResult<QuotePayload> {
        self.get(symbol)
            .and_then(|s| s.quote.as_ref())
            .and_then(|q| q.first())
            .cloned()
            .ok_or(ScreenError::MissingQuote)
    }

    fn fundamentals(&self, symbol: &str, quarters: usize) -> ScreenResult<Vec<FundamentalsRecord>> {
        Ok(self
            .get(symbol)
            .map(|s| s.fundamentals.iter().take(quarters).cloned().collect())
            .unwrap_or_default())
    }

    fn cash_flow(&self, symbol: &str, quarters: usize) -> ScreenResult<Vec<CashFlowRecord>> {
        Ok(self
            .get(symbol)
            .map(|s| s.cash_flow.iter().take(quarters).cloned().collect())
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Fetch and adapt one listing. Quote first, then the two quarterly series.
pub fn collect_input<S>(source: &S, listing: &Listing) -> ScreenResult<StockInput>
where
    S: MarketDataSource + ?Sized,
{
    let quote = source.quote(&listing.symbol)?;
    let fundamentals = source.fundamentals(&listing.symbol, REQUIRED_QUARTERS)?;
    let cash_flow = source.cash_flow(&listing.symbol, REQUIRED_QUARTERS)?;
    build_stock_input(listing, &quote, &fundamentals, &cash_flow)
}

/// Screen a universe against a data source.
///
/// Fetch failures are recorded against the symbol like any other checkpoint
/// failure, and a panic in a source or the engine becomes that symbol's
/// `UnexpectedFailure`. Only an invalid configuration aborts the run.
pub fn screen_source<S>(
    listings: &[Listing],
    source: &S,
    config: &ValuationConfig,
) -> ScreenResult<ScreenReport>
where
    S: MarketDataSource + ?Sized,
{
    config.validate()?;

    let mut report = ScreenReport::default();
    for listing in listings {
        info!(symbol = %listing.symbol, "Processing {}...", listing.symbol);
        let outcome = isolate(|| {
            collect_input(source, listing).and_then(|input| value_stock(&input, config))
        });
        report.record(&listing.symbol, outcome);
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataSeries;
    use crate::provider::QuoteResponse;
    use rust_decimal_macros::dec;

    fn snapshot(symbol: &str, quarters: usize) -> SymbolSnapshot {
        let fundamentals = (0..quarters)
            .map(|_| FundamentalsRecord {
                ebit_reported: Some(dec!(30)),
                assets_current_cash: Some(dec!(300)),
                debt_short_term: Some(dec!(100)),
                depreciation_and_amortization_cash_flow: Some(dec!(3)),
                expenses_depreciation_and_amortization: Some(dec!(2)),
                ..Default::default()
            })
            .collect();
        let cash_flow = (0..quarters)
            .map(|_| CashFlowRecord {
                capital_expenditures: Some(dec!(-2.5)),
            })
            .collect();
        SymbolSnapshot {
            symbol: symbol.into(),
            name: format!("{symbol} Inc"),
            sector: "Technology".into(),
            industry: "Software".into(),
            quote: Some(QuoteResponse::One(QuotePayload {
                close: Some(dec!(10)),
                market_cap: Some(dec!(1000)),
                ..Default::default()
            })),
            fundamentals,
            cash_flow,
        }
    }

    #[test]
    fn test_unknown_symbol_has_no_quote() {
        let source = SnapshotSource::new(vec![snapshot("AAA", 12)]);
        assert_eq!(source.quote("ZZZ"), Err(ScreenError::MissingQuote));
        assert!(source.fundamentals("ZZZ", 12).unwrap().is_empty());
    }

    #[test]
    fn test_series_truncated_to_request() {
        let source = SnapshotSource::new(vec![snapshot("AAA", 16)]);
        assert_eq!(source.fundamentals("AAA", 12).unwrap().len(), 12);
        assert_eq!(source.cash_flow("AAA", 4).unwrap().len(), 4);
    }

    #[test]
    fn test_collect_input_short_history() {
        let source = SnapshotSource::new(vec![snapshot("AAA", 11)]);
        let listing = Listing {
            symbol: "AAA".into(),
            ..Default::default()
        };
        assert_eq!(
            collect_input(&source, &listing).unwrap_err(),
            ScreenError::InsufficientHistory {
                series: DataSeries::Fundamentals,
                required: 12,
                actual: 11,
            }
        );
    }

    #[test]
    fn test_listings_dedupe_in_order() {
        let source =
            SnapshotSource::new(vec![snapshot("B", 12), snapshot("A", 12), snapshot("B", 12)]);
        let symbols: Vec<_> = source.listings().into_iter().map(|l| l.symbol).collect();
        assert_eq!(symbols, vec!["B", "A"]);
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn test_screen_source_isolates_failures() {
        let source = SnapshotSource::new(vec![snapshot("GOOD", 12), snapshot("SHORT", 8)]);
        let mut listings = source.listings();
        listings.push(Listing {
            symbol: "GONE".into(),
            ..Default::default()
        });

        let report = screen_source(&listings, &source, &ValuationConfig::default()).unwrap();
        assert_eq!(report.valued.len(), 1);
        assert_eq!(report.valued[0].symbol, "GOOD");
        assert_eq!(report.valued[0].name, "GOOD Inc");
        assert_eq!(report.valued[0].sector, "Technology");
        assert_eq!(report.valued[0].industry, "Software");
        let kinds: Vec<_> = report.failures.iter().map(|f| f.kind.as_str()).collect();
        assert_eq!(kinds, vec!["InsufficientHistory", "MissingQuote"]);
    }

    /// Delegates to snapshots but panics when asked about one symbol.
    struct FlakySource {
        inner: SnapshotSource,
        broken: &'static str,
    }

    impl MarketDataSource for FlakySource {
        fn quote(&self, symbol: &str) -> ScreenResult<QuotePayload> {
            if symbol == self.broken {
                panic!("quote feed returned garbage for {symbol}");
            }
            self.inner.quote(symbol)
        }

        fn fundamentals(
            &self,
            symbol: &str,
            quarters: usize,
        ) -> ScreenResult<Vec<FundamentalsRecord>> {
            self.inner.fundamentals(symbol, quarters)
        }

        fn cash_flow(&self, symbol: &str, quarters: usize) -> ScreenResult<Vec<CashFlowRecord>> {
            self.inner.cash_flow(symbol, quarters)
        }
    }

    #[test]
    fn test_panicking_source_fails_only_its_symbol() {
        let source = FlakySource {
            inner: SnapshotSource::new(vec![snapshot("BAD", 12), snapshot("GOOD", 12)]),
            broken: "BAD",
        };
        let listings = source.inner.listings();

        let report = screen_source(&listings, &source, &ValuationConfig::default()).unwrap();
        assert_eq!(report.valued.len(), 1);
        assert_eq!(report.valued[0].symbol, "GOOD");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].symbol, "BAD");
        assert_eq!(report.failures[0].kind, "UnexpectedFailure");
        assert_eq!(
            report.failures[0].to_string(),
            "BAD: Unexpected failure: quote feed returned garbage for BAD"
        );
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        let err = SnapshotSource::from_json("{not json").unwrap_err();
        assert_eq!(err.kind(), "Serialization");
        assert!(err.is_fatal());
    }
}
