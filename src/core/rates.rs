//! Exchange rate types and the persisted document shapes

use super::currency::CurrencyCode;
use super::error::{RateError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// Source recorded for entries seeded from the built-in fallback table.
pub const FALLBACK_SOURCE: &str = "mock";

/// Whole-cache source recorded after an update cycle.
pub const UPDATER_SOURCE: &str = "ParserService";

/// An ordered currency pair. `EUR_USD` is the price of one EUR in USD.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct RatePair {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

impl RatePair {
    pub fn new(from: CurrencyCode, to: CurrencyCode) -> Self {
        Self { from, to }
    }

    pub fn parse(from: &str, to: &str) -> Result<Self> {
        Ok(Self::new(from.parse()?, to.parse()?))
    }

    pub fn key(&self) -> String {
        format!("{}_{}", self.from, self.to)
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.to.clone(), self.from.clone())
    }
}

impl Display for RatePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.from, self.to)
    }
}

impl FromStr for RatePair {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self> {
        let (from, to) = s
            .split_once('_')
            .ok_or_else(|| RateError::RateUnavailable(s.to_string()))?;
        Self::parse(from, to)
    }
}

/// A cached rate for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub rate: f64,
    pub updated_at: DateTime<Utc>,
    pub source: String,
}

/// The on-disk rate cache: `"<FROM>_<TO>"` keys next to the whole-cache metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateCacheDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(flatten)]
    pub pairs: BTreeMap<String, RateEntry>,
}

impl RateCacheDocument {
    pub fn get(&self, pair: &RatePair) -> Option<&RateEntry> {
        self.pairs.get(&pair.key())
    }

    pub fn insert(&mut self, pair: &RatePair, entry: RateEntry) {
        self.pairs.insert(pair.key(), entry);
    }

    /// Records a completed write cycle in the whole-cache metadata.
    pub fn mark_refreshed(&mut self, at: DateTime<Utc>, source: &str) {
        self.last_refresh = Some(at);
        self.source = Some(source.to_string());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryMeta {
    pub request_ms: u64,
    pub status_code: u16,
}

/// One fetched rate observation, immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: f64,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    #[serde(default)]
    pub meta: HistoryMeta,
}

impl HistoryEntry {
    pub fn new(
        pair: &RatePair,
        rate: f64,
        timestamp: DateTime<Utc>,
        source: &str,
        meta: HistoryMeta,
    ) -> Self {
        let id = format!(
            "{}_{}",
            pair.key(),
            timestamp.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
        );
        Self {
            id,
            from_currency: pair.from.to_string(),
            to_currency: pair.to.to_string(),
            rate,
            timestamp,
            source: source.to_string(),
            meta,
        }
    }
}

/// Returns true for values usable as an exchange rate.
pub fn is_valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// True while `updated_at` is at most `ttl_seconds` old. Sub-second ages
/// count, so an entry 300.5s old is stale under a 300s TTL.
pub fn is_fresh(updated_at: DateTime<Utc>, now: DateTime<Utc>, ttl_seconds: u64) -> bool {
    let ttl = i64::try_from(ttl_seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX);
    now.signed_duration_since(updated_at) <= ttl
}

/// Offline rates used when the cache has no entry for a pair.
/// Both directions are listed explicitly.
pub fn fallback_rate(pair: &RatePair) -> Option<f64> {
    let rate = match (pair.from.as_str(), pair.to.as_str()) {
        ("EUR", "USD") => 1.0786,
        ("BTC", "USD") => 59337.21,
        ("RUB", "USD") => 0.01016,
        ("ETH", "USD") => 3720.00,
        ("USD", "EUR") => 1.0 / 1.0786,
        ("USD", "BTC") => 1.0 / 59337.21,
        ("USD", "RUB") => 1.0 / 0.01016,
        ("USD", "ETH") => 1.0 / 3720.00,
        _ => return None,
    };
    Some(rate)
}
