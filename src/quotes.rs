//! Point lookup of daily quotes by (asset, fiat, day).

use std::collections::{BTreeSet, HashMap};

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::decimal::percent_change;
use crate::error::{EngineError, RecordKind};
use crate::ledger::{parse_or_skip, IngestReport, MalformedPolicy};
use crate::models::{AssetSymbol, FiatCode, Quote, RawQuote};

/// Which price of a daily quote converts a balance into fiat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceConvention {
    /// End-of-day close.
    #[default]
    Close,
    /// Arithmetic mean of open and close.
    OpenCloseAverage,
}

/// What to do when two quotes share an (asset, fiat, day) key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The first quote in input order wins; later ones are counted and logged.
    #[default]
    KeepFirst,
    /// Fail with [`EngineError::DuplicateQuote`].
    Reject,
}

type QuoteKey = (AssetSymbol, FiatCode, NaiveDate);

#[derive(Debug, Clone)]
pub struct QuoteIndex {
    quotes: HashMap<QuoteKey, Quote>,
    currencies: BTreeSet<FiatCode>,
    convention: PriceConvention,
}

impl QuoteIndex {
    /// Index already parsed quotes.
    pub fn build(
        quotes: impl IntoIterator<Item = Quote>,
        convention: PriceConvention,
        duplicates: DuplicatePolicy,
    ) -> Result<(Self, usize), EngineError> {
        let mut index = HashMap::new();
        let mut currencies = BTreeSet::new();
        let mut ignored = 0usize;

        for quote in quotes {
            let key = (quote.coin.clone(), quote.fiat.clone(), quote.date);
            if index.contains_key(&key) {
                match duplicates {
                    DuplicatePolicy::Reject => {
                        let (coin, fiat, date) = key;
                        return Err(EngineError::DuplicateQuote { coin, fiat, date });
                    }
                    DuplicatePolicy::KeepFirst => {
                        warn!(
                            coin = %quote.coin,
                            fiat = %quote.fiat,
                            date = %quote.date,
                            "Ignoring duplicate quote"
                        );
                        ignored += 1;
                        continue;
                    }
                }
            }
            currencies.insert(quote.fiat.clone());
            index.insert(key, quote);
        }

        Ok((
            Self {
                quotes: index,
                currencies,
                convention,
            },
            ignored,
        ))
    }

    /// Parse raw quotes and index them, recording skipped and duplicate
    /// records in `report`.
    pub fn from_raw(
        raw: &[RawQuote],
        convention: PriceConvention,
        duplicates: DuplicatePolicy,
        malformed: MalformedPolicy,
        report: &mut IngestReport,
    ) -> Result<Self, EngineError> {
        let mut parsed = Vec::with_capacity(raw.len());
        for (index, record) in raw.iter().enumerate() {
            if let Some(quote) = parse_or_skip(
                RecordKind::Quote,
                index,
                record,
                Quote::parse,
                malformed,
                &mut report.malformed_quotes,
            )? {
                parsed.push(quote);
            }
        }

        let (index, ignored) = Self::build(parsed, convention, duplicates)?;
        report.duplicate_quotes = ignored;
        Ok(index)
    }

    pub fn convention(&self) -> PriceConvention {
        self.convention
    }

    /// Every fiat currency that appears in at least one quote.
    pub fn currencies(&self) -> &BTreeSet<FiatCode> {
        &self.currencies
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn get(&self, asset: &AssetSymbol, currency: &FiatCode, date: NaiveDate) -> Option<&Quote> {
        self.quotes.get(&(asset.clone(), currency.clone(), date))
    }

    /// Conversion price for the day under the index's [`PriceConvention`].
    /// `None` means unquoted, which is not the same as a zero price.
    pub fn price_on(
        &self,
        asset: &AssetSymbol,
        currency: &FiatCode,
        date: NaiveDate,
    ) -> Option<Decimal> {
        let quote = self.get(asset, currency, date)?;
        Some(match self.convention {
            PriceConvention::Close => quote.close.amount,
            PriceConvention::OpenCloseAverage => {
                let (open, close) = (quote.open.amount, quote.close.amount);
                match open.checked_add(close) {
                    Some(sum) => sum / Decimal::TWO,
                    // Halve first near the top of the range.
                    None => (open / Decimal::TWO).saturating_add(close / Decimal::TWO),
                }
            }
        })
    }

    /// Close-to-close change versus the previous day, in percent.
    ///
    /// Zero when either day is unquoted or the previous close is zero.
    pub fn change_on(&self, asset: &AssetSymbol, currency: &FiatCode, date: NaiveDate) -> Decimal {
        let close = |day: NaiveDate| self.get(asset, currency, day).map(|q| q.close.amount);
        let previous = date
            .checked_sub_days(Days::new(1))
            .and_then(|day| close(day));
        percent_change(close(date), previous)
    }
}
