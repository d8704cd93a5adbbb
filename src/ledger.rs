//! Validated, chronologically ordered transaction ledger.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{EngineError, RecordKind};
use crate::models::{AssetSymbol, RawTransaction, Transaction};

/// What to do with a record that cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// Drop the record, log it and list it in the ingest report.
    #[default]
    Skip,
    /// Fail the whole build with [`EngineError::MalformedRecord`].
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedRecord {
    /// Position in the merged input.
    pub index: usize,
    pub asset: AssetSymbol,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    pub index: usize,
    pub reason: String,
}

/// Filtering decisions taken while ingesting the raw inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub accepted_transactions: usize,
    /// Transactions whose asset is not in the supported set.
    pub unsupported_dropped: Vec<DroppedRecord>,
    pub malformed_transactions: Vec<SkippedRecord>,
    pub malformed_quotes: Vec<SkippedRecord>,
    /// Quotes ignored because an earlier quote had the same key.
    pub duplicate_quotes: usize,
}

/// Parse a record, applying `policy` on failure. `Ok(None)` means skipped.
pub(crate) fn parse_or_skip<R, T>(
    kind: RecordKind,
    index: usize,
    raw: &R,
    parse: impl Fn(&R) -> Result<T, EngineError>,
    policy: MalformedPolicy,
    skipped: &mut Vec<SkippedRecord>,
) -> Result<Option<T>, EngineError> {
    match parse(raw) {
        Ok(record) => Ok(Some(record)),
        Err(err) => match policy {
            MalformedPolicy::Abort => Err(EngineError::MalformedRecord {
                kind,
                index,
                reason: err.to_string(),
            }),
            MalformedPolicy::Skip => {
                warn!(%kind, index, error = %err, "Skipping malformed record");
                skipped.push(SkippedRecord {
                    index,
                    reason: err.to_string(),
                });
                Ok(None)
            }
        },
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    transactions: Vec<Transaction>,
    assets: Vec<AssetSymbol>,
}

impl Ledger {
    /// Parse, filter and order raw records.
    ///
    /// Records for assets outside `supported` are dropped; the rest are
    /// sorted by timestamp, ties keeping their input order. Fails with
    /// [`EngineError::EmptyLedger`] when nothing is left.
    pub fn ingest(
        raw: &[RawTransaction],
        supported: &HashSet<AssetSymbol>,
        policy: MalformedPolicy,
        report: &mut IngestReport,
    ) -> Result<Self, EngineError> {
        let mut parsed = Vec::with_capacity(raw.len());
        for (index, record) in raw.iter().enumerate() {
            let Some(tx) = parse_or_skip(
                RecordKind::Transaction,
                index,
                record,
                Transaction::parse,
                policy,
                &mut report.malformed_transactions,
            )?
            else {
                continue;
            };

            if supported.contains(&tx.asset) {
                parsed.push(tx);
            } else {
                debug!(index, asset = %tx.asset, "Dropping transaction for unsupported asset");
                report.unsupported_dropped.push(DroppedRecord {
                    index,
                    asset: tx.asset,
                });
            }
        }

        if !report.unsupported_dropped.is_empty() {
            warn!(
                count = report.unsupported_dropped.len(),
                "Dropped transactions for unsupported assets"
            );
        }

        let ledger = Self::from_transactions(parsed)?;
        report.accepted_transactions = ledger.transactions.len();
        Ok(ledger)
    }

    /// Build a ledger from already validated transactions.
    pub fn from_transactions(mut transactions: Vec<Transaction>) -> Result<Self, EngineError> {
        if transactions.is_empty() {
            return Err(EngineError::EmptyLedger);
        }

        // `sort_by_key` is stable: same-instant entries keep input order.
        transactions.sort_by_key(|tx| tx.timestamp);

        let assets = transactions
            .iter()
            .map(|tx| tx.asset.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Ok(Self {
            transactions,
            assets,
        })
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Distinct assets present in the ledger, sorted.
    pub fn assets(&self) -> &[AssetSymbol] {
        &self.assets
    }

    /// Day of the first transaction.
    pub fn earliest_date(&self) -> NaiveDate {
        // Non-empty by construction.
        self.transactions[0].day()
    }

    /// Last day the series runs through: the clock's current day, never
    /// earlier than [`Self::earliest_date`].
    pub fn latest_processing_date(&self, clock: &dyn Clock) -> NaiveDate {
        clock.today().max(self.earliest_date())
    }
}
