use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::AssetSymbol;
use crate::calendar;
use crate::decimal::parse_decimal;
use crate::error::EngineError;

/// An amount as it appears in source documents: a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(serde_json::Number),
    Text(String),
}

impl RawAmount {
    /// Convert to an exact decimal. Numbers go through their shortest
    /// textual form, so `0.1` becomes exactly `0.1`.
    pub fn to_decimal(&self) -> Result<Decimal, EngineError> {
        match self {
            RawAmount::Number(n) => parse_decimal(&n.to_string()),
            RawAmount::Text(s) => parse_decimal(s),
        }
    }
}

impl From<&str> for RawAmount {
    fn from(value: &str) -> Self {
        RawAmount::Text(value.to_string())
    }
}

/// A ledger entry exactly as a ledger source delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub date: String,
    pub asset: String,
    pub amount: RawAmount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault: Option<String>,
}

impl RawTransaction {
    pub fn new(date: impl Into<String>, asset: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            asset: asset.into(),
            amount: RawAmount::Text(amount.into()),
            note: None,
            vault: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_vault(mut self, vault: impl Into<String>) -> Self {
        self.vault = Some(vault.into());
        self
    }
}

/// A validated ledger entry. Positive amounts are deposits, negative ones
/// withdrawals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    /// Instant the entry was recorded at; plain days are midnight UTC.
    pub timestamp: DateTime<Utc>,
    pub asset: AssetSymbol,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault: Option<String>,
}

impl Transaction {
    pub fn parse(raw: &RawTransaction) -> Result<Self, EngineError> {
        Ok(Self {
            timestamp: calendar::parse_instant(&raw.date)?,
            asset: AssetSymbol::new(&raw.asset),
            amount: raw.amount.to_decimal()?,
            note: raw.note.clone(),
            vault: raw.vault.clone(),
        })
    }

    /// UTC calendar day of the entry.
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}
