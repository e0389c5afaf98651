use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use dcf_screen_core::ValuationConfig;

use crate::input;

/// Valuation rates: an optional file, then per-flag overrides
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to a JSON or YAML file with valuation rates
    #[arg(long)]
    pub config: Option<String>,

    /// Discount rate for the terminal value (e.g. 0.08 for 8%)
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Perpetual growth rate beyond the projection horizon
    #[arg(long, allow_negative_numbers = true)]
    pub terminal_growth_rate: Option<Decimal>,

    /// Cap on the growth rate used for the 5-year projection
    #[arg(long, alias = "max-conservative-growth-rate")]
    pub max_growth_rate: Option<Decimal>,
}

impl ConfigArgs {
    /// Build and validate the effective configuration. Flags win over the file.
    pub fn resolve(&self) -> Result<ValuationConfig, Box<dyn std::error::Error>> {
        let mut config: ValuationConfig = match self.config {
            Some(ref path) => input::file::read_config(path)?,
            None => ValuationConfig::default(),
        };

        if let Some(rate) = self.discount_rate {
            config = config.with_discount_rate(rate);
        }
        if let Some(rate) = self.terminal_growth_rate {
            config = config.with_terminal_growth_rate(rate);
        }
        if let Some(rate) = self.max_growth_rate {
            config = config.with_max_conservative_growth_rate(rate);
        }

        config.validate()?;
        debug!(?config, "resolved configuration");
        Ok(config)
    }
}

pub fn run_config(args: ConfigArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = args.resolve()?;
    Ok(serde_json::json!({ "result": config }))
}
