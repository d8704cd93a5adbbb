use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{AssetSymbol, FiatCode, RawAmount};
use crate::calendar;
use crate::error::EngineError;

/// One side (open or close) of a raw quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPriceMark {
    pub amount: RawAmount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// A daily price observation exactly as a quote source delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuote {
    pub coin: String,
    pub fiat: String,
    pub date: String,
    pub open: RawPriceMark,
    pub close: RawPriceMark,
}

impl RawQuote {
    /// Quote whose open and close share one price and carry no timestamps.
    pub fn flat(
        coin: impl Into<String>,
        fiat: impl Into<String>,
        date: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        let price = price.into();
        Self {
            coin: coin.into(),
            fiat: fiat.into(),
            date: date.into(),
            open: RawPriceMark {
                amount: RawAmount::Text(price.clone()),
                time: None,
            },
            close: RawPriceMark {
                amount: RawAmount::Text(price),
                time: None,
            },
        }
    }

    pub fn with_open(mut self, price: impl Into<String>) -> Self {
        self.open.amount = RawAmount::Text(price.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceMark {
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl PriceMark {
    fn parse(raw: &RawPriceMark) -> Result<Self, EngineError> {
        Ok(Self {
            amount: raw.amount.to_decimal()?,
            time: raw
                .time
                .as_deref()
                .map(calendar::parse_instant)
                .transpose()?,
        })
    }
}

/// Best-known open/close price of one asset in one fiat currency on one
/// UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub coin: AssetSymbol,
    pub fiat: FiatCode,
    pub date: NaiveDate,
    pub open: PriceMark,
    pub close: PriceMark,
}

impl Quote {
    pub fn parse(raw: &RawQuote) -> Result<Self, EngineError> {
        Ok(Self {
            coin: AssetSymbol::new(&raw.coin),
            fiat: FiatCode::new(&raw.fiat),
            date: calendar::parse_day(&raw.date)?,
            open: PriceMark::parse(&raw.open)?,
            close: PriceMark::parse(&raw.close)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_open_close_document() {
        let json = r#"{
            "coin": "BTC",
            "fiat": "USD",
            "date": "2021-01-02",
            "open": {"amount": 29000.5, "time": "2021-01-02T00:00:00Z"},
            "close": {"amount": "31000", "time": "2021-01-02T23:59:59Z"}
        }"#;
        let raw: RawQuote = serde_json::from_str(json).unwrap();
        let quote = Quote::parse(&raw).unwrap();

        assert_eq!(quote.coin, AssetSymbol::new("btc"));
        assert_eq!(quote.fiat, FiatCode::new("usd"));
        assert_eq!(quote.date, NaiveDate::from_ymd_opt(2021, 1, 2).unwrap());
        assert_eq!(quote.open.amount, Decimal::from_str("29000.5").unwrap());
        assert_eq!(quote.close.amount, Decimal::from_str("31000").unwrap());
        assert!(quote.close.time.is_some());
    }

    #[test]
    fn rejects_malformed_prices() {
        let raw = RawQuote::flat("btc", "usd", "2021-01-02", "n/a");
        assert!(matches!(
            Quote::parse(&raw),
            Err(EngineError::InvalidAmount { .. })
        ));
    }
}
