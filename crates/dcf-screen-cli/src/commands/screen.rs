use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use dcf_screen_core::provider::{screen_source, Listing, SnapshotSource, SymbolSnapshot};
use dcf_screen_core::valuation::screener::{ScreenFailure, StockValuation};

use super::config::ConfigArgs;
use crate::input;

/// Arguments for batch screening
#[derive(Args)]
pub struct ScreenArgs {
    /// Path to a JSON array of symbol snapshots (reads stdin when piped)
    #[arg(long)]
    pub input: Option<String>,

    /// JSON array of { Symbol, Name } entries restricting and ordering the run
    #[arg(long)]
    pub universe: Option<String>,

    #[command(flatten)]
    pub rates: ConfigArgs,

    /// Only report symbols whose model value exceeds market cap
    #[arg(long)]
    pub undervalued_only: bool,

    /// Order results by upside potential, highest first
    #[arg(long)]
    pub sort_by_upside: bool,

    /// Append a `SYMBOL: reason` line per skipped symbol to this file
    #[arg(long)]
    pub error_log: Option<String>,

    /// Add sector, industry, volume, per-year EBIT/D&A/capex and the rates
    #[arg(long)]
    pub all_columns: bool,

    /// Add Yahoo Finance quote and statement links to each row
    #[arg(long)]
    pub links: bool,

    /// Also write the results to a dated CSV file
    #[arg(long)]
    pub save: bool,

    /// Directory for --save
    #[arg(long, default_value = ".")]
    pub save_dir: String,
}

/// One valuation flattened and rounded for tables and CSV.
///
/// The optional columns are filled by [`ScreenRow::with_all_columns`] and
/// [`ScreenRow::with_links`]; unset ones are left out of the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenRow {
    pub symbol: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    pub price: Decimal,
    pub market_cap: Decimal,
    pub shares_outstanding: Decimal,
    pub net_cash: Decimal,
    pub fcf_current_year: Decimal,
    pub fcf_3yr_average: Decimal,
    pub growth_rate: Decimal,
    pub conservative_growth_rate: Decimal,
    pub terminal_value_adjusted: Decimal,
    pub target_price: Decimal,
    pub target_price_aggressive: Decimal,
    pub upside_potential: Decimal,
    pub undervalued: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebit_current_year: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebit_3yr_average: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depreciation_current_year: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depreciation_3yr_average: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capex_current_year: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capex_3yr_average: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_growth_rate: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_statement_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_flow_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_sheet_url: Option<String>,
}

const YAHOO_QUOTE_BASE: &str = "https://finance.yahoo.com/quote";

impl ScreenRow {
    pub fn with_all_columns(mut self, v: &StockValuation) -> Self {
        self.sector = Some(v.sector.clone());
        self.industry = Some(v.industry.clone());
        self.volume = Some(v.volume.round_dp(0));
        self.ebit_current_year = Some(v.ebit_current_year.round_dp(0));
        self.ebit_3yr_average = Some(v.ebit_3yr_average.round_dp(0));
        self.depreciation_current_year = Some(v.depreciation_current_year.round_dp(0));
        self.depreciation_3yr_average = Some(v.depreciation_3yr_average.round_dp(0));
        self.capex_current_year = Some(v.capex_current_year.round_dp(0));
        self.capex_3yr_average = Some(v.capex_3yr_average.round_dp(0));
        self.discount_rate = Some(v.discount_rate);
        self.terminal_growth_rate = Some(v.terminal_growth_rate);
        self
    }

    /// Quote page plus the annual income, cash-flow and balance-sheet pages.
    pub fn with_links(mut self) -> Self {
        let base = format!("{YAHOO_QUOTE_BASE}/{}", self.symbol);
        self.income_statement_url = Some(format!("{base}/financials"));
        self.cash_flow_url = Some(format!("{base}/cash-flow"));
        self.balance_sheet_url = Some(format!("{base}/balance-sheet"));
        self.quote_url = Some(base);
        self
    }
}

impl From<&StockValuation> for ScreenRow {
    fn from(v: &StockValuation) -> Self {
        Self {
            symbol: v.symbol.clone(),
            name: v.name.clone(),
            sector: None,
            industry: None,
            price: v.price.round_dp(2),
            market_cap: v.market_cap.round_dp(0),
            shares_outstanding: v.shares_outstanding.round_dp(0),
            net_cash: v.net_cash.round_dp(0),
            fcf_current_year: v.fcf_current_year.round_dp(0),
            fcf_3yr_average: v.fcf_3yr_average.round_dp(0),
            growth_rate: v.recent_average_fcf_growth_rate.round_dp(4),
            conservative_growth_rate: v.recent_average_fcf_conservative_growth_rate.round_dp(4),
            terminal_value_adjusted: v.terminal_value_adjusted.round_dp(0),
            target_price: v.dcf_target_per_share_price.round_dp(2),
            target_price_aggressive: v.dcf_target_per_share_price_aggressive.round_dp(2),
            upside_potential: v.upside_potential.round_dp(4),
            undervalued: v.is_undervalued,
            volume: None,
            ebit_current_year: None,
            ebit_3yr_average: None,
            depreciation_current_year: None,
            depreciation_3yr_average: None,
            capex_current_year: None,
            capex_3yr_average: None,
            discount_rate: None,
            terminal_growth_rate: None,
            quote_url: None,
            income_statement_url: None,
            cash_flow_url: None,
            balance_sheet_url: None,
        }
    }
}

pub fn run_screen(args: ScreenArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = args.rates.resolve()?;

    let snapshots: Vec<SymbolSnapshot> = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input file is required (or pipe a batch on stdin)".into());
    };
    let source = SnapshotSource::new(snapshots);

    let listings: Vec<Listing> = match args.universe {
        Some(ref path) => input::file::read_json(path)?,
        None => source.listings(),
    };

    let mut report = screen_source(&listings, &source, &config)?;
    if args.sort_by_upside {
        report.sort_by_upside();
    }

    if let Some(ref path) = args.error_log {
        append_error_log(Path::new(path), &report.failures)?;
    }

    let valuations: Vec<&StockValuation> = report
        .valued
        .iter()
        .filter(|v| !args.undervalued_only || v.is_undervalued)
        .collect();
    let rows: Vec<ScreenRow> = valuations
        .iter()
        .map(|v| {
            let mut row = ScreenRow::from(*v);
            if args.all_columns {
                row = row.with_all_columns(v);
            }
            if args.links {
                row = row.with_links();
            }
            row
        })
        .collect();

    if args.save {
        let date = Local::now().format("%Y-%m-%d").to_string();
        let path = next_save_path(Path::new(&args.save_dir), &date);
        write_csv(&path, &rows)?;
        info!(path = %path.display(), rows = rows.len(), "saved results");
    }

    Ok(serde_json::json!({
        "summary": report.summary(),
        "results": rows,
        "valuations": valuations,
        "failures": report.failures,
        "warnings": report.warnings,
    }))
}

/// `{date}-data.csv`, or the first free `{date}-data{n}.csv`.
fn next_save_path(dir: &Path, date: &str) -> PathBuf {
    let first = dir.join(format!("{date}-data.csv"));
    if !first.exists() {
        return first;
    }
    (1u32..)
        .map(|n| dir.join(format!("{date}-data{n}.csv")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

fn write_csv(path: &Path, rows: &[ScreenRow]) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| format!("Failed to create '{}': {}", path.display(), e))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn append_error_log(
    path: &Path,
    failures: &[ScreenFailure],
) -> Result<(), Box<dyn std::error::Error>> {
    if failures.is_empty() {
        return Ok(());
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed to open '{}': {}", path.display(), e))?;
    for failure in failures {
        writeln!(file, "{failure}")?;
    }
    Ok(())
}
