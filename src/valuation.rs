//! Projection of native balances into fiat values.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::decimal::RoundingMode;
use crate::error::EngineError;
use crate::models::{AssetSymbol, FiatCode};
use crate::quotes::QuoteIndex;
use crate::series::BalanceSeries;

/// One asset on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetDay {
    pub native_balance: Decimal,
    /// Value per tracked currency. `None` when no quote existed for that
    /// day; serialized as `null`, never as zero.
    pub valuation: BTreeMap<FiatCode, Option<Decimal>>,
}

/// Computed state of the portfolio at the end of one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySnapshot {
    pub date: NaiveDate,
    pub per_asset: BTreeMap<AssetSymbol, AssetDay>,
    /// Sum of the present valuations per currency.
    pub total: BTreeMap<FiatCode, Decimal>,
    /// Currencies whose total leaves out at least one asset holding a
    /// non-zero balance that had no quote that day.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub incomplete: BTreeMap<FiatCode, BTreeSet<AssetSymbol>>,
}

impl DailySnapshot {
    pub fn valuation(&self, asset: &AssetSymbol, currency: &FiatCode) -> Option<Decimal> {
        self.per_asset
            .get(asset)
            .and_then(|day| day.valuation.get(currency).copied().flatten())
    }

    pub fn native_balance(&self, asset: &AssetSymbol) -> Decimal {
        self.per_asset
            .get(asset)
            .map_or(Decimal::ZERO, |day| day.native_balance)
    }

    pub fn total(&self, currency: &FiatCode) -> Decimal {
        self.total.get(currency).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn is_complete(&self, currency: &FiatCode) -> bool {
        !self.incomplete.contains_key(currency)
    }
}

/// Rounding applied to every fiat cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiatRounding {
    pub mode: RoundingMode,
    pub decimals: u32,
}

impl Default for FiatRounding {
    fn default() -> Self {
        Self {
            mode: RoundingMode::HalfUp,
            decimals: 2,
        }
    }
}

/// Value every balance row in `currencies`.
///
/// Each cell is `balance * price` rounded once; totals add the rounded
/// cells, so a total always equals the sum of the values shown for it.
/// A value or total outside the decimal range fails with
/// [`EngineError::Overflow`].
pub fn project(
    series: &BalanceSeries,
    quotes: &QuoteIndex,
    currencies: &[FiatCode],
    rounding: FiatRounding,
) -> Result<Vec<DailySnapshot>, EngineError> {
    let mut unquoted_holdings = 0usize;

    let snapshots = series
        .rows()
        .iter()
        .map(|row| {
            let overflow = |asset: &AssetSymbol| EngineError::Overflow {
                asset: asset.clone(),
                date: row.date,
            };
            let mut total: BTreeMap<FiatCode, Decimal> = currencies
                .iter()
                .map(|currency| (currency.clone(), Decimal::ZERO))
                .collect();
            let mut incomplete: BTreeMap<FiatCode, BTreeSet<AssetSymbol>> = BTreeMap::new();
            let mut per_asset = BTreeMap::new();

            for (asset, balance) in &row.balances {
                let mut valuation = BTreeMap::new();
                for currency in currencies {
                    let value = match quotes.price_on(asset, currency, row.date) {
                        Some(price) => {
                            let raw = balance.checked_mul(price).ok_or_else(|| overflow(asset))?;
                            Some(rounding.mode.round(raw, rounding.decimals))
                        }
                        None => None,
                    };

                    match value {
                        Some(value) => {
                            if let Some(sum) = total.get_mut(currency) {
                                *sum = sum.checked_add(value).ok_or_else(|| overflow(asset))?;
                            }
                        }
                        None if !balance.is_zero() => {
                            debug!(%asset, %currency, date = %row.date, "No quote for holding");
                            unquoted_holdings += 1;
                            incomplete
                                .entry(currency.clone())
                                .or_default()
                                .insert(asset.clone());
                        }
                        None => {}
                    }
                    valuation.insert(currency.clone(), value);
                }

                per_asset.insert(
                    asset.clone(),
                    AssetDay {
                        native_balance: *balance,
                        valuation,
                    },
                );
            }

            Ok(DailySnapshot {
                date: row.date,
                per_asset,
                total,
                incomplete,
            })
        })
        .collect::<Result<Vec<_>, EngineError>>()?;

    if unquoted_holdings > 0 {
        warn!(
            cells = unquoted_holdings,
            "Some holdings had no quote and are left out of daily totals"
        );
    }

    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{IngestReport, Ledger, MalformedPolicy};
    use crate::models::{RawQuote, RawTransaction, Transaction};
    use crate::quotes::{DuplicatePolicy, PriceConvention};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, d).unwrap()
    }

    fn snapshots(
        txs: &[RawTransaction],
        quotes: &[RawQuote],
        currencies: &[&str],
        end: u32,
    ) -> Vec<DailySnapshot> {
        let ledger = Ledger::from_transactions(
            txs.iter().map(|r| Transaction::parse(r).unwrap()).collect(),
        )
        .unwrap();
        let mut report = IngestReport::default();
        let index = QuoteIndex::from_raw(
            quotes,
            PriceConvention::Close,
            DuplicatePolicy::KeepFirst,
            MalformedPolicy::Skip,
            &mut report,
        )
        .unwrap();
        let series = BalanceSeries::build(&ledger, day(end)).unwrap();
        let currencies: Vec<FiatCode> = currencies.iter().map(|c| FiatCode::new(c)).collect();
        project(&series, &index, &currencies, FiatRounding::default()).unwrap()
    }

    #[test]
    fn values_balances_at_the_days_price() {
        let result = snapshots(
            &[
                RawTransaction::new("2021-01-01", "btc", "1"),
                RawTransaction::new("2021-01-03", "btc", "-0.5"),
            ],
            &[
                RawQuote::flat("btc", "usd", "2021-01-01", "30000"),
                RawQuote::flat("btc", "usd", "2021-01-02", "31000"),
                RawQuote::flat("btc", "usd", "2021-01-03", "32000"),
            ],
            &["usd"],
            3,
        );
        let btc = AssetSymbol::new("btc");
        let usd = FiatCode::new("usd");

        assert_eq!(result[0].valuation(&btc, &usd), Some(dec("30000")));
        assert_eq!(result[2].native_balance(&btc), dec("0.5"));
        assert_eq!(result[2].total(&usd).to_string(), "16000.00");
    }

    #[test]
    fn missing_quotes_stay_absent_and_flag_the_total() {
        let result = snapshots(
            &[
                RawTransaction::new("2021-01-01", "btc", "1"),
                RawTransaction::new("2021-01-01", "eth", "2"),
            ],
            &[
                RawQuote::flat("btc", "usd", "2021-01-01", "100"),
                RawQuote::flat("eth", "usd", "2021-01-02", "10"),
            ],
            &["usd"],
            2,
        );
        let btc = AssetSymbol::new("btc");
        let eth = AssetSymbol::new("eth");
        let usd = FiatCode::new("usd");

        assert_eq!(result[0].valuation(&eth, &usd), None);
        assert_eq!(result[0].per_asset[&eth].valuation[&usd], None);
        assert_eq!(result[0].total(&usd), dec("100.00"));
        assert!(!result[0].is_complete(&usd));
        assert!(result[0].incomplete[&usd].contains(&eth));

        assert_eq!(result[1].valuation(&btc, &usd), None);
        assert_eq!(result[1].total(&usd), dec("20.00"));
    }

    #[test]
    fn zero_balances_without_quotes_do_not_mark_incomplete() {
        let result = snapshots(
            &[
                RawTransaction::new("2021-01-01", "btc", "1"),
                RawTransaction::new("2021-01-02", "eth", "1"),
            ],
            &[RawQuote::flat("btc", "usd", "2021-01-01", "5")],
            &["usd"],
            1,
        );
        let usd = FiatCode::new("usd");
        assert!(result[0].is_complete(&usd));
        assert_eq!(result[0].valuation(&AssetSymbol::new("eth"), &usd), None);
    }

    #[test]
    fn totals_equal_the_sum_of_cells() {
        let result = snapshots(
            &[
                RawTransaction::new("2021-01-01", "btc", "0.333"),
                RawTransaction::new("2021-01-01", "eth", "1.005"),
            ],
            &[
                RawQuote::flat("btc", "usd", "2021-01-01", "0.015"),
                RawQuote::flat("eth", "usd", "2021-01-01", "0.005"),
                RawQuote::flat("btc", "eur", "2021-01-01", "1"),
            ],
            &["usd", "eur"],
            1,
        );
        for snapshot in &result {
            for (currency, total) in &snapshot.total {
                let sum: Decimal = snapshot
                    .per_asset
                    .values()
                    .filter_map(|a| a.valuation[currency])
                    .sum();
                assert_eq!(*total, sum);
            }
        }
    }

    #[test]
    fn each_cell_is_rounded_half_up() {
        let result = snapshots(
            &[RawTransaction::new("2021-01-01", "btc", "0.5")],
            &[RawQuote::flat("btc", "usd", "2021-01-01", "0.25")],
            &["usd"],
            1,
        );
        // 0.125 rounds away from zero.
        assert_eq!(
            result[0].valuation(&AssetSymbol::new("btc"), &FiatCode::new("usd")),
            Some(dec("0.13"))
        );
    }

    #[test]
    fn value_overflow_is_an_error() {
        let ledger = Ledger::from_transactions(vec![
            Transaction::parse(&RawTransaction::new("2021-01-01", "btc", "1e15")).unwrap(),
        ])
        .unwrap();
        let mut report = IngestReport::default();
        let index = QuoteIndex::from_raw(
            &[RawQuote::flat("btc", "usd", "2021-01-01", "1e15")],
            PriceConvention::Close,
            DuplicatePolicy::KeepFirst,
            MalformedPolicy::Skip,
            &mut report,
        )
        .unwrap();
        let series = BalanceSeries::build(&ledger, day(1)).unwrap();

        let err = project(&series, &index, &[FiatCode::new("usd")], FiatRounding::default())
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Overflow {
                asset: AssetSymbol::new("btc"),
                date: day(1),
            }
        );
    }
}
