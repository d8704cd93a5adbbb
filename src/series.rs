//! Day-by-day cumulative balances per asset.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::calendar::{day_count, days_inclusive};
use crate::decimal::sum;
use crate::error::EngineError;
use crate::ledger::Ledger;
use crate::models::AssetSymbol;

/// End-of-day balances for every ledger asset on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceRow {
    pub date: NaiveDate,
    pub balances: BTreeMap<AssetSymbol, Decimal>,
}

/// Exact sum of every `asset` amount dated on or before `through`.
pub fn running_balance(
    ledger: &Ledger,
    asset: &AssetSymbol,
    through: NaiveDate,
) -> Result<Decimal, EngineError> {
    sum(ledger
        .transactions()
        .iter()
        .filter(|tx| &tx.asset == asset && tx.day() <= through)
        .map(|tx| &tx.amount))
    .ok_or_else(|| EngineError::Overflow {
        asset: asset.clone(),
        date: through,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BalanceSeries {
    rows: Vec<BalanceRow>,
}

impl BalanceSeries {
    /// One row per day in `[ledger.earliest_date(), end]`, with no gaps.
    ///
    /// Walks the sorted ledger once, carrying balances forward through days
    /// without activity. Transactions dated after `end` are not counted.
    /// Fails with [`EngineError::Overflow`] if a balance leaves the decimal
    /// range.
    pub fn build(ledger: &Ledger, end: NaiveDate) -> Result<Self, EngineError> {
        let start = ledger.earliest_date();
        let mut running: BTreeMap<AssetSymbol, Decimal> = ledger
            .assets()
            .iter()
            .map(|asset| (asset.clone(), Decimal::ZERO))
            .collect();

        let transactions = ledger.transactions();
        let mut cursor = 0usize;
        let mut rows = Vec::with_capacity(day_count(start, end));

        for date in days_inclusive(start, end) {
            while let Some(tx) = transactions.get(cursor) {
                if tx.day() > date {
                    break;
                }
                if let Some(balance) = running.get_mut(&tx.asset) {
                    *balance = balance.checked_add(tx.amount).ok_or_else(|| {
                        EngineError::Overflow {
                            asset: tx.asset.clone(),
                            date,
                        }
                    })?;
                }
                cursor += 1;
            }
            rows.push(BalanceRow {
                date,
                balances: running.clone(),
            });
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[BalanceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&BalanceRow> {
        let first = self.rows.first()?.date;
        let offset = usize::try_from((date - first).num_days()).ok()?;
        self.rows.get(offset)
    }
}
