//! Ledger-to-valuation engine: one call from raw records to the full report.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::decimal::RoundingMode;
use crate::error::EngineError;
use crate::latest::{latest_view, LatestView, PercentRounding};
use crate::ledger::{IngestReport, Ledger, MalformedPolicy};
use crate::models::{AssetSymbol, FiatCode, RawQuote, RawTransaction, Transaction};
use crate::quotes::{DuplicatePolicy, PriceConvention, QuoteIndex};
use crate::series::BalanceSeries;
use crate::valuation::{project, DailySnapshot, FiatRounding};

fn default_supported_assets() -> Vec<AssetSymbol> {
    ["btc", "eth", "ltc", "bch", "xrp", "ada", "dot", "sol", "doge", "xlm"]
        .into_iter()
        .map(AssetSymbol::new)
        .collect()
}

fn default_decimals() -> u32 {
    2
}

/// Knobs that select between the conventions the engine supports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub price_convention: PriceConvention,

    /// Rounding applied to fiat values and percentages.
    pub rounding: RoundingMode,

    /// Decimal places of every fiat value.
    #[serde(default = "default_decimals")]
    pub fiat_decimals: u32,

    /// Decimal places of every percentage.
    #[serde(default = "default_decimals")]
    pub percent_decimals: u32,

    /// Transactions for any other asset are dropped at ingestion.
    #[serde(default = "default_supported_assets")]
    pub supported_assets: Vec<AssetSymbol>,

    /// Currencies to value in. Empty means every currency seen in quotes.
    pub tracked_currencies: Vec<FiatCode>,

    pub duplicate_quotes: DuplicatePolicy,

    pub malformed_records: MalformedPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            price_convention: PriceConvention::default(),
            rounding: RoundingMode::default(),
            fiat_decimals: default_decimals(),
            percent_decimals: default_decimals(),
            supported_assets: default_supported_assets(),
            tracked_currencies: Vec::new(),
            duplicate_quotes: DuplicatePolicy::default(),
            malformed_records: MalformedPolicy::default(),
        }
    }
}

/// Everything the engine derives from one snapshot of inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineReport {
    pub assets: Vec<AssetSymbol>,
    pub currencies: Vec<FiatCode>,
    /// One snapshot per day from the first transaction through today.
    pub balances: Vec<DailySnapshot>,
    pub latest: LatestView,
    /// The ingested ledger, oldest first.
    pub transactions: Vec<Transaction>,
    pub ingest: IngestReport,
}

pub struct ValuationEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl ValuationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run ingestion, indexing, series building, projection and the latest
    /// view, in that order. Inputs are only read.
    pub fn build(
        &self,
        transactions: &[RawTransaction],
        quotes: &[RawQuote],
    ) -> Result<EngineReport, EngineError> {
        let config = &self.config;
        let mut ingest = IngestReport::default();

        let supported: HashSet<AssetSymbol> = config.supported_assets.iter().cloned().collect();
        let ledger = Ledger::ingest(
            transactions,
            &supported,
            config.malformed_records,
            &mut ingest,
        )?;

        let index = QuoteIndex::from_raw(
            quotes,
            config.price_convention,
            config.duplicate_quotes,
            config.malformed_records,
            &mut ingest,
        )?;

        let currencies: Vec<FiatCode> = if config.tracked_currencies.is_empty() {
            index.currencies().iter().cloned().collect()
        } else {
            // Codes are normalized, so "usd" and "USD" collapse here.
            let mut seen = HashSet::new();
            config
                .tracked_currencies
                .iter()
                .filter(|currency| seen.insert(*currency))
                .cloned()
                .collect()
        };

        let end = ledger.latest_processing_date(self.clock.as_ref());
        let series = BalanceSeries::build(&ledger, end)?;
        debug!(
            start = %ledger.earliest_date(),
            %end,
            days = series.len(),
            "Built balance series"
        );

        let balances = project(
            &series,
            &index,
            &currencies,
            FiatRounding {
                mode: config.rounding,
                decimals: config.fiat_decimals,
            },
        )?;

        let latest = latest_view(
            &balances,
            &index,
            &currencies,
            PercentRounding {
                mode: config.rounding,
                decimals: config.percent_decimals,
            },
        );

        info!(
            transactions = ingest.accepted_transactions,
            quotes = index.len(),
            assets = ledger.assets().len(),
            currencies = currencies.len(),
            days = balances.len(),
            "Valuation complete"
        );

        Ok(EngineReport {
            assets: ledger.assets().to_vec(),
            currencies,
            balances,
            latest,
            transactions: ledger.transactions().to_vec(),
            ingest,
        })
    }

    /// Merge several transaction collections, in order, and build.
    pub fn build_from_collections(
        &self,
        collections: &[Vec<RawTransaction>],
        quotes: &[RawQuote],
    ) -> Result<EngineReport, EngineError> {
        let merged: Vec<RawTransaction> = collections.iter().flatten().cloned().collect();
        self.build(&merged, quotes)
    }
}
