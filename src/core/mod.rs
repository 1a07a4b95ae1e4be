//! Core business logic: currencies, rates, refresh cycles and trades

pub mod config;
pub mod currency;
pub mod error;
pub mod log;
pub mod provider;
pub mod rates;
pub mod resolver;
pub mod trade;
pub mod updater;

// Re-export main types for cleaner imports
pub use currency::{Currency, CurrencyCode, get_currency};
pub use error::RateError;
pub use provider::{FetchedRates, RateProvider};
pub use rates::{HistoryEntry, RateCacheDocument, RateEntry, RatePair};
pub use resolver::RateResolver;
pub use trade::{TradeService, WalletLedger};
pub use updater::{RatesUpdater, UpdateSummary};
