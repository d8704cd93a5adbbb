//! Daily holdings and fiat valuation history for a crypto ledger.
//!
//! [`engine::ValuationEngine`] turns raw transactions and daily quotes into
//! a gap-free day-by-day series plus a latest view with day-over-day change.
//! The engine is pure; [`sources`] does the I/O.

pub mod calendar;
pub mod clock;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod error;
pub mod format;
pub mod latest;
pub mod ledger;
pub mod models;
pub mod quotes;
pub mod series;
pub mod valuation;

#[cfg(feature = "sources")]
pub mod sources;

pub use engine::{EngineConfig, EngineReport, ValuationEngine};
pub use error::EngineError;
