use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use hodlbook::calendar::parse_day;
use hodlbook::config::{default_config_path, LedgerLocation, ResolvedConfig};
use hodlbook::engine::{EngineReport, ValuationEngine};
use hodlbook::format::{format_day, format_fiat};
use hodlbook::sources::{
    load_and_build, GistLedgerSource, JsonFileLedgerSource, JsonQuoteSource, LedgerSource,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "hodlbook")]
#[command(about = "Daily holdings and valuation history for a crypto ledger")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Daily balances and valuations
    History {
        /// First day to print (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day_arg)]
        from: Option<NaiveDate>,

        /// Last day to print (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day_arg)]
        to: Option<NaiveDate>,
    },
    /// Latest holdings with day-over-day change
    Latest,
    /// Ledger entries, newest first
    Transactions,
    /// Show current configuration
    Config,
}

fn parse_day_arg(value: &str) -> Result<NaiveDate, String> {
    parse_day(value).map_err(|e| e.to_string())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

#[derive(Serialize)]
struct TransactionRow<'a> {
    date: String,
    asset: &'a str,
    amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vault: Option<&'a str>,
}

#[derive(Serialize)]
struct LatestOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    date_display: Option<String>,
    #[serde(flatten)]
    view: &'a hodlbook::latest::LatestView,
    total_display: BTreeMap<&'a str, String>,
}

async fn build_report(config: &ResolvedConfig) -> Result<EngineReport> {
    let ledger: Box<dyn LedgerSource> = match &config.ledger {
        LedgerLocation::Files(paths) => Box::new(JsonFileLedgerSource::new(paths.clone())),
        LedgerLocation::Gist { id, token } => {
            let source = GistLedgerSource::new(id.clone());
            Box::new(match token {
                Some(token) => {
                    source.with_token(SecretString::from(token.expose_secret().to_string()))
                }
                None => source,
            })
        }
    };
    let quotes = JsonQuoteSource::new(config.quotes_path.clone());
    let engine = ValuationEngine::new(config.engine.clone());
    load_and_build(&engine, ledger.as_ref(), &quotes).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = ResolvedConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load hodlbook config: {}", config_path.display()))?;

    match cli.command {
        Command::Config => {
            println!("Config file: {}", config_path.display());
            match &config.ledger {
                LedgerLocation::Files(paths) => {
                    for path in paths {
                        println!("Ledger: {}", path.display());
                    }
                }
                LedgerLocation::Gist { id, token } => {
                    println!(
                        "Ledger: gist {id}{}",
                        if token.is_some() { " (authenticated)" } else { "" }
                    );
                }
            }
            println!("Quotes: {}", config.quotes_path.display());
            println!();
            print_json(&config.engine)?;
        }
        Command::History { from, to } => {
            let report = build_report(&config).await?;
            let rows: Vec<_> = report
                .balances
                .iter()
                .filter(|s| from.map_or(true, |from| s.date >= from))
                .filter(|s| to.map_or(true, |to| s.date <= to))
                .collect();
            print_json(&rows)?;
        }
        Command::Latest => {
            let report = build_report(&config).await?;
            let view = &report.latest;
            let total_display = view
                .total
                .iter()
                .map(|(currency, total)| {
                    (
                        currency.as_str(),
                        format_fiat(total.valuation, config.display.currency_grouping),
                    )
                })
                .collect();
            print_json(&LatestOutput {
                date_display: view
                    .date
                    .map(|date| format_day(date, &config.display.date_format)),
                view,
                total_display,
            })?;
        }
        Command::Transactions => {
            let report = build_report(&config).await?;
            let rows: Vec<TransactionRow> = report
                .transactions
                .iter()
                .rev()
                .map(|tx| TransactionRow {
                    date: format_day(tx.day(), &config.display.date_format),
                    asset: tx.asset.as_str(),
                    amount: tx.amount.to_string(),
                    note: tx.note.as_deref(),
                    vault: tx.vault.as_deref(),
                })
                .collect();
            print_json(&rows)?;
        }
    }

    Ok(())
}
