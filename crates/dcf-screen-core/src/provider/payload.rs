use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::source::Listing;

/// Daily quote as returned by the data provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default)]
    pub close: Option<Decimal>,
    #[serde(default)]
    pub iex_close: Option<Decimal>,
    #[serde(default)]
    pub latest_price: Option<Decimal>,
    #[serde(default)]
    pub market_cap: Option<Decimal>,
    #[serde(default)]
    pub avg_total_volume: Option<Decimal>,
}

/// Providers return quotes either bare or wrapped in a one-element array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuoteResponse {
    Many(Vec<QuotePayload>),
    One(QuotePayload),
}

impl QuoteResponse {
    pub fn first(&self) -> Option<&QuotePayload> {
        match self {
            QuoteResponse::Many(quotes) => quotes.first(),
            QuoteResponse::One(quote) => Some(quote),
        }
    }
}

/// One quarter of the provider's fundamentals series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundamentalsRecord {
    #[serde(default)]
    pub ebit_reported: Option<Decimal>,
    #[serde(default)]
    pub assets_current_cash: Option<Decimal>,
    #[serde(default)]
    pub cash_long_term: Option<Decimal>,
    #[serde(default)]
    pub cash_operating: Option<Decimal>,
    #[serde(default)]
    pub liabilities_non_current_debt: Option<Decimal>,
    #[serde(default)]
    pub debt_short_term: Option<Decimal>,
    #[serde(default)]
    pub debt_financial: Option<Decimal>,
    #[serde(default)]
    pub depreciation_and_amortization_cash_flow: Option<Decimal>,
    #[serde(default)]
    pub expenses_depreciation_and_amortization: Option<Decimal>,
}

/// One quarter of the provider's cash-flow series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowRecord {
    #[serde(default)]
    pub capital_expenditures: Option<Decimal>,
}

/// Everything fetched for one symbol, as stored in a batch file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSnapshot {
    #[serde(alias = "Symbol")]
    pub symbol: String,
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Sector")]
    pub sector: String,
    #[serde(default, alias = "Industry")]
    pub industry: String,
    #[serde(default)]
    pub quote: Option<QuoteResponse>,
    /// Most recent quarter first
    #[serde(default)]
    pub fundamentals: Vec<FundamentalsRecord>,
    /// Most recent quarter first
    #[serde(default)]
    pub cash_flow: Vec<CashFlowRecord>,
}

impl SymbolSnapshot {
    /// The identity part of the snapshot.
    pub fn listing(&self) -> Listing {
        Listing {
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            sector: self.sector.clone(),
            industry: self.industry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_array_or_object() {
        let many: QuoteResponse =
            serde_json::from_str(r#"[{"close": 12.5, "marketCap": 1000}]"#).unwrap();
        let one: QuoteResponse =
            serde_json::from_str(r#"{"latestPrice": "9.75", "avgTotalVolume": 300}"#).unwrap();
        assert_eq!(many.first().unwrap().close, Some(dec!(12.5)));
        assert_eq!(one.first().unwrap().latest_price, Some(dec!(9.75)));
        assert_eq!(one.first().unwrap().avg_total_volume, Some(dec!(300)));
    }

    #[test]
    fn test_empty_quote_array_has_no_first() {
        let empty: QuoteResponse = serde_json::from_str("[]").unwrap();
        assert!(empty.first().is_none());
    }

    #[test]
    fn test_null_and_missing_fields() {
        let rec: FundamentalsRecord =
            serde_json::from_str(r#"{"ebitReported": null, "cashOperating": 5, "extra": "x"}"#)
                .unwrap();
        assert_eq!(rec.ebit_reported, None);
        assert_eq!(rec.cash_operating, Some(dec!(5)));
        assert_eq!(rec.debt_financial, None);
    }

    #[test]
    fn test_snapshot_accepts_listing_casing() {
        let snap: SymbolSnapshot = serde_json::from_str(
            r#"{"Symbol": "ACME", "Name": "Acme Corp", "Sector": "Industrials"}"#,
        )
        .unwrap();
        assert_eq!(snap.symbol, "ACME");
        assert_eq!(snap.name, "Acme Corp");
        assert_eq!(snap.listing().sector, "Industrials");
        assert_eq!(snap.listing().industry, "");
        assert!(snap.quote.is_none());
        assert!(snap.fundamentals.is_empty());
    }
}
