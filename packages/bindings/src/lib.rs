use napi::Result as NapiResult;
use napi_derive::napi;

use dcf_screen_core::provider::{screen_source, SnapshotSource};
use dcf_screen_core::valuation::StockInput;
use dcf_screen_core::ValuationConfig;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Missing or empty config JSON means defaults.
fn parse_config(config_json: Option<String>) -> NapiResult<ValuationConfig> {
    match config_json.as_deref().map(str::trim) {
        None | Some("") => Ok(ValuationConfig::default()),
        Some(json) => serde_json::from_str(json).map_err(to_napi_error),
    }
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

/// Value one already-normalised symbol and return the output envelope.
#[napi]
pub fn value_stock(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let input: StockInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let config = parse_config(config_json)?;
    let output =
        dcf_screen_core::valuation::value_stock(&input, &config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Screen a batch of provider snapshots; per-symbol failures are part of
/// the returned report, only bad input or configuration rejects the call.
#[napi]
pub fn screen(batch_json: String, config_json: Option<String>) -> NapiResult<String> {
    let source = SnapshotSource::from_json(&batch_json).map_err(to_napi_error)?;
    let config = parse_config(config_json)?;
    let report = screen_source(&source.listings(), &source, &config).map_err(to_napi_error)?;
    serde_json::to_string(&serde_json::json!({
        "summary": report.summary(),
        "valued": report.valued,
        "failures": report.failures,
        "warnings": report.warnings,
    }))
    .map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[napi]
pub fn default_config() -> NapiResult<String> {
    serde_json::to_string(&ValuationConfig::default()).map_err(to_napi_error)
}
