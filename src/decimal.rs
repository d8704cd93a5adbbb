//! Exact decimal helpers shared by the balance and valuation stages.
//!
//! Every amount that gets summed, multiplied or rounded goes through
//! [`Decimal`]; binary floats never enter the engine.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// How fiat values and percentages are rounded to their display precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Midpoints round away from zero (`0.125` -> `0.13`, `-0.125` -> `-0.13`).
    #[default]
    HalfUp,
    /// Banker's rounding (`0.125` -> `0.12`).
    HalfEven,
    /// Truncate toward zero.
    TowardZero,
}

impl RoundingMode {
    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
            RoundingMode::TowardZero => RoundingStrategy::ToZero,
        }
    }

    /// Round `value` to `dp` decimal places. The result always carries
    /// exactly `dp` places of scale, so `16000` renders as `16000.00`.
    pub fn round(self, value: Decimal, dp: u32) -> Decimal {
        let mut rounded = value.round_dp_with_strategy(dp, self.strategy());
        rounded.rescale(dp);
        rounded
    }
}

/// Parse a decimal from its textual form, accepting plain (`"-0.5"`) and
/// scientific (`"1e-7"`) notation.
pub fn parse_decimal(value: &str) -> Result<Decimal, EngineError> {
    let trimmed = value.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| EngineError::InvalidAmount {
            value: value.to_string(),
        })
}

/// Percentage change from `previous` to `latest`.
///
/// Returns zero whenever there is no rate to report: `previous` missing or
/// zero, or `latest` missing. Never divides by zero.
pub fn percent_change(latest: Option<Decimal>, previous: Option<Decimal>) -> Decimal {
    let (Some(latest), Some(previous)) = (latest, previous) else {
        return Decimal::ZERO;
    };
    if previous.is_zero() {
        return Decimal::ZERO;
    }
    (latest - previous)
        .checked_div(previous)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

/// Exact sum. Order never matters for [`Decimal`] addition within range;
/// `None` once the range is exceeded.
pub fn sum<'a>(values: impl IntoIterator<Item = &'a Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
}
