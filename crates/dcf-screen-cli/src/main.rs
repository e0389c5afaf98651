mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::config::ConfigArgs;
use commands::screen::ScreenArgs;
use commands::value::ValueArgs;

/// Screen stocks for undervaluation with a discounted free-cash-flow model
#[derive(Parser)]
#[command(
    name = "dcf-screen",
    version,
    about = "Screen stocks for undervaluation with a discounted free-cash-flow model",
    long_about = "Values each symbol from twelve quarters of fundamentals: 3-year average \
                  free cash flow, a dampened growth rate, a 5-year projection and a Gordon \
                  growth terminal value adjusted for net cash. Symbols whose model value \
                  exceeds market capitalisation are flagged as undervalued."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Emit log lines as JSON on stderr
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Screen a batch of symbol snapshots
    Screen(ScreenArgs),
    /// Value a single symbol snapshot and print the full breakdown
    Value(ValueArgs),
    /// Print the effective valuation configuration
    Config(ConfigArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dcf_screen=info,dcf_screen_core=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Screen(args) => commands::screen::run_screen(args),
        Commands::Value(args) => commands::value::run_value(args),
        Commands::Config(args) => commands::config::run_config(args),
        Commands::Version => {
            println!("dcf-screen {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
