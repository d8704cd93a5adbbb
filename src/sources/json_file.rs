//! JSON files on local disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, warn};

use super::{LedgerSource, QuoteSource};
use crate::models::{RawQuote, RawTransaction};

/// Reads transaction collections from files and directories.
///
/// Each file holds one JSON array of transactions. A directory contributes
/// every `*.json` file directly inside it, in file name order.
pub struct JsonFileLedgerSource {
    paths: Vec<PathBuf>,
}

impl JsonFileLedgerSource {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    async fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for path in &self.paths {
            let meta = fs::metadata(path)
                .await
                .with_context(|| format!("Ledger path not found: {}", path.display()))?;
            if !meta.is_dir() {
                files.push(path.clone());
                continue;
            }

            let mut found = Vec::new();
            let mut entries = fs::read_dir(path)
                .await
                .with_context(|| format!("Failed to list {}", path.display()))?;
            while let Some(entry) = entries.next_entry().await? {
                let candidate = entry.path();
                if is_json_file(&candidate) && entry.file_type().await?.is_file() {
                    found.push(candidate);
                }
            }
            if found.is_empty() {
                warn!(dir = %path.display(), "No .json files in ledger directory");
            }
            found.sort();
            files.extend(found);
        }
        Ok(files)
    }
}

fn is_json_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[async_trait::async_trait]
impl LedgerSource for JsonFileLedgerSource {
    async fn fetch_collections(&self) -> Result<Vec<Vec<RawTransaction>>> {
        let mut collections = Vec::new();
        for file in self.collect_files().await? {
            let content = fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let collection: Vec<RawTransaction> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON from {}", file.display()))?;
            debug!(file = %file.display(), records = collection.len(), "Loaded ledger file");
            collections.push(collection);
        }
        Ok(collections)
    }

    fn name(&self) -> &str {
        "json-file"
    }
}

/// Reads quotes from a JSON array or a JSONL file.
pub struct JsonQuoteSource {
    path: PathBuf,
}

impl JsonQuoteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl QuoteSource for JsonQuoteSource {
    async fn fetch_quotes(&self) -> Result<Vec<RawQuote>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "Quote file not found; valuing without quotes");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };
        parse_quotes(&content)
            .with_context(|| format!("Failed to parse quotes from {}", self.path.display()))
    }

    fn name(&self) -> &str {
        "json-file"
    }
}

fn parse_quotes(content: &str) -> Result<Vec<RawQuote>> {
    if content.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(content)?);
    }

    let mut quotes = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let quote: RawQuote = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse JSONL line {}", number + 1))?;
        quotes.push(quote);
    }
    Ok(quotes)
}
