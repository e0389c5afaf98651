//! Boundary between provider payloads and the valuation engine.
//!
//! Payload shapes are fixed, typed records with optional fields so that
//! presence is checked explicitly; the adapter maps them onto
//! [`StockInput`](crate::valuation::StockInput). Fetching (and any retry
//! policy) sits behind [`MarketDataSource`].

pub mod adapter;
pub mod payload;
pub mod source;

pub use adapter::build_stock_input;
pub use payload::{CashFlowRecord, FundamentalsRecord, QuotePayload, QuoteResponse, SymbolSnapshot};
pub use source::{collect_input, screen_source, Listing, MarketDataSource, SnapshotSource};
