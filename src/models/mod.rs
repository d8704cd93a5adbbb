mod asset;
mod quote;
mod transaction;

pub use asset::{AssetSymbol, FiatCode};
pub use quote::{PriceMark, Quote, RawPriceMark, RawQuote};
pub use transaction::{RawAmount, RawTransaction, Transaction};
