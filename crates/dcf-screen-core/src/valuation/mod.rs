pub(crate) mod arith;
pub mod dcf;
pub mod fcf;
pub mod fundamentals;
pub mod growth;
pub mod quote;
pub mod screener;
pub mod verdict;

pub use screener::{screen, value_stock, ScreenReport, StockInput, StockValuation};
