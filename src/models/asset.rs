use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Ticker of a held asset (`btc`, `eth`, ...), normalised to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AssetSymbol(String);

/// Fiat currency code (`usd`, `eur`, ...), normalised to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FiatCode(String);

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

impl AssetSymbol {
    pub fn new(symbol: &str) -> Self {
        Self(normalize(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FiatCode {
    pub fn new(code: &str) -> Self {
        Self(normalize(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for AssetSymbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| Self::new(&s))
    }
}

impl<'de> Deserialize<'de> for FiatCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| Self::new(&s))
    }
}

impl fmt::Display for AssetSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for FiatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for AssetSymbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<&str> for FiatCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for AssetSymbol {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for FiatCode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_case_and_whitespace_insensitive() {
        assert_eq!(AssetSymbol::new(" BTC "), AssetSymbol::new("btc"));
        assert_eq!(FiatCode::new("USD").as_str(), "usd");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&AssetSymbol::new("ETH")).unwrap();
        assert_eq!(json, r#""eth""#);
    }

    #[test]
    fn deserializing_normalises() {
        let fiat: FiatCode = serde_json::from_str(r#"" EUR""#).unwrap();
        assert_eq!(fiat, FiatCode::new("eur"));
    }
}
