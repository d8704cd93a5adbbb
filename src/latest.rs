//! Most recent day of the series with its day-over-day change.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::decimal::{percent_change, RoundingMode};
use crate::models::{AssetSymbol, FiatCode};
use crate::quotes::QuoteIndex;
use crate::valuation::DailySnapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestAsset {
    pub amount: Decimal,
    /// `None` when the asset had no quote on the latest day.
    pub valuation: BTreeMap<FiatCode, Option<Decimal>>,
    /// Change of this asset's value versus the previous day, in percent.
    pub day_change_percent: BTreeMap<FiatCode, Decimal>,
    /// Close-to-close change of the asset's quote, in percent.
    pub quote_change_percent: BTreeMap<FiatCode, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestTotal {
    pub valuation: Decimal,
    pub day_change_percent: Decimal,
    /// False when a held asset had no quote on the latest day.
    pub complete: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LatestView {
    pub date: Option<NaiveDate>,
    pub per_asset: BTreeMap<AssetSymbol, LatestAsset>,
    pub total: BTreeMap<FiatCode, LatestTotal>,
}

pub fn latest(series: &[DailySnapshot]) -> Option<&DailySnapshot> {
    series.last()
}

pub fn previous(series: &[DailySnapshot]) -> Option<&DailySnapshot> {
    series.len().checked_sub(2).and_then(|i| series.get(i))
}

/// Percent precision for change figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercentRounding {
    pub mode: RoundingMode,
    pub decimals: u32,
}

impl Default for PercentRounding {
    fn default() -> Self {
        Self {
            mode: RoundingMode::HalfUp,
            decimals: 2,
        }
    }
}

/// Build the latest view from the last two snapshots.
///
/// Assets with a zero balance on both days are left out. A previous day
/// that is missing, zero-valued or unquoted yields a change of zero.
pub fn latest_view(
    series: &[DailySnapshot],
    quotes: &QuoteIndex,
    currencies: &[FiatCode],
    rounding: PercentRounding,
) -> LatestView {
    let Some(last) = latest(series) else {
        return LatestView::default();
    };
    let prior = previous(series);
    let round = |value: Decimal| rounding.mode.round(value, rounding.decimals);

    let mut per_asset = BTreeMap::new();
    for (asset, day) in &last.per_asset {
        let prior_balance = prior.map_or(Decimal::ZERO, |p| p.native_balance(asset));
        if day.native_balance.is_zero() && prior_balance.is_zero() {
            continue;
        }

        let mut day_change_percent = BTreeMap::new();
        let mut quote_change_percent = BTreeMap::new();
        for currency in currencies {
            let now = day.valuation.get(currency).copied().flatten();
            let before = prior.and_then(|p| p.valuation(asset, currency));
            day_change_percent.insert(currency.clone(), round(percent_change(now, before)));
            quote_change_percent.insert(
                currency.clone(),
                round(quotes.change_on(asset, currency, last.date)),
            );
        }

        per_asset.insert(
            asset.clone(),
            LatestAsset {
                amount: day.native_balance,
                valuation: day.valuation.clone(),
                day_change_percent,
                quote_change_percent,
            },
        );
    }

    let total = currencies
        .iter()
        .map(|currency| {
            let now = last.total(currency);
            let before = prior.map(|p| p.total(currency));
            (
                currency.clone(),
                LatestTotal {
                    valuation: now,
                    day_change_percent: round(percent_change(Some(now), before)),
                    complete: last.is_complete(currency),
                },
            )
        })
        .collect();

    LatestView {
        date: Some(last.date),
        per_asset,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::AssetDay;
    use std::collections::BTreeSet;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn snapshot(d: u32, assets: &[(&str, &str, Option<&str>)]) -> DailySnapshot {
        let usd = FiatCode::new("usd");
        let mut per_asset = BTreeMap::new();
        let mut total = Decimal::ZERO;
        for (asset, balance, value) in assets {
            let value = value.map(dec);
            total += value.unwrap_or(Decimal::ZERO);
            per_asset.insert(
                AssetSymbol::new(asset),
                AssetDay {
                    native_balance: dec(balance),
                    valuation: BTreeMap::from([(usd.clone(), value)]),
                },
            );
        }
        DailySnapshot {
            date: NaiveDate::from_ymd_opt(2021, 1, d).unwrap(),
            per_asset,
            total: BTreeMap::from([(usd, total)]),
            incomplete: BTreeMap::new(),
        }
    }

    fn empty_quotes() -> QuoteIndex {
        QuoteIndex::build(
            Vec::new(),
            crate::quotes::PriceConvention::Close,
            crate::quotes::DuplicatePolicy::KeepFirst,
        )
        .unwrap()
        .0
    }

    #[test]
    fn computes_asset_and_total_change() {
        let series = vec![
            snapshot(1, &[("btc", "1", Some("100")), ("eth", "1", Some("50"))]),
            snapshot(2, &[("btc", "1", Some("110")), ("eth", "1", Some("40"))]),
        ];
        let usd = FiatCode::new("usd");
        let view = latest_view(
            &series,
            &empty_quotes(),
            &[usd.clone()],
            PercentRounding::default(),
        );

        let btc = &view.per_asset[&AssetSymbol::new("btc")];
        assert_eq!(btc.day_change_percent[&usd], dec("10"));
        let eth = &view.per_asset[&AssetSymbol::new("eth")];
        assert_eq!(eth.day_change_percent[&usd], dec("-20"));
        // 150 -> 150
        assert_eq!(view.total[&usd].valuation, dec("150"));
        assert_eq!(view.total[&usd].day_change_percent, Decimal::ZERO);
        assert_eq!(view.date, NaiveDate::from_ymd_opt(2021, 1, 2));
    }

    #[test]
    fn zero_previous_saturates_to_zero() {
        let series = vec![
            snapshot(1, &[("btc", "0", Some("0"))]),
            snapshot(2, &[("btc", "1", Some("100"))]),
        ];
        let usd = FiatCode::new("usd");
        let view = latest_view(&series, &empty_quotes(), &[usd.clone()], PercentRounding::default());

        assert_eq!(
            view.per_asset[&AssetSymbol::new("btc")].day_change_percent[&usd],
            Decimal::ZERO
        );
        assert_eq!(view.total[&usd].day_change_percent, Decimal::ZERO);
    }

    #[test]
    fn assets_empty_on_both_days_are_hidden() {
        let series = vec![
            snapshot(1, &[("btc", "1", Some("1")), ("eth", "0", None)]),
            snapshot(2, &[("btc", "1", Some("1")), ("eth", "0", None)]),
        ];
        let usd = FiatCode::new("usd");
        let view = latest_view(&series, &empty_quotes(), &[usd], PercentRounding::default());
        let shown: BTreeSet<_> = view.per_asset.keys().map(AssetSymbol::as_str).collect();
        assert_eq!(shown, BTreeSet::from(["btc"]));
    }

    #[test]
    fn asset_sold_today_is_still_shown() {
        let series = vec![
            snapshot(1, &[("btc", "1", Some("100"))]),
            snapshot(2, &[("btc", "0", Some("0"))]),
        ];
        let usd = FiatCode::new("usd");
        let view = latest_view(&series, &empty_quotes(), &[usd.clone()], PercentRounding::default());
        let btc = &view.per_asset[&AssetSymbol::new("btc")];
        assert_eq!(btc.amount, Decimal::ZERO);
        assert_eq!(btc.day_change_percent[&usd], dec("-100"));
    }

    #[test]
    fn single_day_series_has_zero_change() {
        let series = vec![snapshot(1, &[("btc", "1", Some("100"))])];
        let usd = FiatCode::new("usd");
        let view = latest_view(&series, &empty_quotes(), &[usd.clone()], PercentRounding::default());
        assert_eq!(view.total[&usd].day_change_percent, Decimal::ZERO);
        assert!(previous(&series).is_none());
    }

    #[test]
    fn empty_series_gives_empty_view() {
        let view = latest_view(&[], &empty_quotes(), &[], PercentRounding::default());
        assert_eq!(view, LatestView::default());
    }
}
