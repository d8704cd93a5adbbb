//! In-memory source for tests and embedding.

use anyhow::Result;
use tokio::sync::Mutex;

use super::{LedgerSource, QuoteSource};
use crate::models::{RawQuote, RawTransaction};

/// Serves whatever was pushed into it, as both a ledger and a quote source.
#[derive(Default)]
pub struct MemorySource {
    collections: Mutex<Vec<Vec<RawTransaction>>>,
    quotes: Mutex<Vec<RawQuote>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, collection: Vec<RawTransaction>) -> Self {
        self.collections.get_mut().push(collection);
        self
    }

    pub fn with_quotes(mut self, quotes: Vec<RawQuote>) -> Self {
        self.quotes.get_mut().extend(quotes);
        self
    }

    pub async fn push_collection(&self, collection: Vec<RawTransaction>) {
        self.collections.lock().await.push(collection);
    }

    pub async fn push_quotes(&self, quotes: impl IntoIterator<Item = RawQuote>) {
        self.quotes.lock().await.extend(quotes);
    }
}

#[async_trait::async_trait]
impl LedgerSource for MemorySource {
    async fn fetch_collections(&self) -> Result<Vec<Vec<RawTransaction>>> {
        Ok(self.collections.lock().await.clone())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[async_trait::async_trait]
impl QuoteSource for MemorySource {
    async fn fetch_quotes(&self) -> Result<Vec<RawQuote>> {
        Ok(self.quotes.lock().await.clone())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
