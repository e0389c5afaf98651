use clap::Args;
use serde_json::Value;

use dcf_screen_core::provider::{collect_input, SnapshotSource, SymbolSnapshot};
use dcf_screen_core::valuation::value_stock;

use super::config::ConfigArgs;
use crate::input;

/// Arguments for valuing a single symbol
#[derive(Args)]
pub struct ValueArgs {
    /// Path to a JSON snapshot of one symbol (reads stdin when piped)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub rates: ConfigArgs,
}

pub fn run_value(args: ValueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = args.rates.resolve()?;

    let snapshot: SymbolSnapshot = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input file is required (or pipe a snapshot on stdin)".into());
    };

    let listing = snapshot.listing();
    let source = SnapshotSource::new(vec![snapshot]);
    let stock = collect_input(&source, &listing)?;
    let result = value_stock(&stock, &config)?;
    Ok(serde_json::to_value(result)?)
}
