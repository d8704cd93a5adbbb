use chrono::NaiveDate;

use crate::models::{AssetSymbol, FiatCode};

/// Failures raised by the valuation engine itself.
///
/// Missing quotes and unsupported assets are not errors: they are reported
/// as data in the result (see `IngestReport` and `DailySnapshot`).
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("ledger is empty: no transactions remain after filtering to supported assets")]
    EmptyLedger,

    #[error("duplicate quote for {coin}/{fiat} on {date}")]
    DuplicateQuote {
        coin: AssetSymbol,
        fiat: FiatCode,
        date: NaiveDate,
    },

    #[error("invalid date {value:?}: expected YYYY-MM-DD or an RFC 3339 instant")]
    InvalidDate { value: String },

    #[error("invalid amount {value:?}")]
    InvalidAmount { value: String },

    #[error("decimal overflow computing {asset} on {date}")]
    Overflow { asset: AssetSymbol, date: NaiveDate },

    #[error("malformed {kind} record #{index}: {reason}")]
    MalformedRecord {
        kind: RecordKind,
        index: usize,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Transaction,
    Quote,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Transaction => f.write_str("transaction"),
            RecordKind::Quote => f.write_str("quote"),
        }
    }
}
