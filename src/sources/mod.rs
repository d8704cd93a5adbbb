//! Where raw ledger and quote records come from.
//!
//! Sources only fetch and decode. Everything they return goes through
//! [`ValuationEngine::build`](crate::engine::ValuationEngine::build) unchanged.

mod json_file;
mod memory;

#[cfg(feature = "gist")]
mod gist;

pub use json_file::{JsonFileLedgerSource, JsonQuoteSource};
pub use memory::MemorySource;

#[cfg(feature = "gist")]
pub use gist::GistLedgerSource;

use anyhow::Result;

use crate::engine::{EngineReport, ValuationEngine};
use crate::models::{RawQuote, RawTransaction};

/// Supplier of one or more transaction collections.
#[async_trait::async_trait]
pub trait LedgerSource: Send + Sync {
    async fn fetch_collections(&self) -> Result<Vec<Vec<RawTransaction>>>;

    fn name(&self) -> &str;
}

#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quotes(&self) -> Result<Vec<RawQuote>>;

    fn name(&self) -> &str;
}

/// Fetch both inputs concurrently and run the engine over them.
pub async fn load_and_build(
    engine: &ValuationEngine,
    ledger: &dyn LedgerSource,
    quotes: &dyn QuoteSource,
) -> Result<EngineReport> {
    let (collections, quotes) = tokio::try_join!(ledger.fetch_collections(), quotes.fetch_quotes())?;
    tracing::debug!(
        ledger = ledger.name(),
        collections = collections.len(),
        quotes = quotes.len(),
        "Fetched inputs"
    );
    Ok(engine.build_from_collections(&collections, &quotes)?)
}
