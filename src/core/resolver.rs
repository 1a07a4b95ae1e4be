//! Decides whether a cached rate may be served as-is.
//!
//! The read path never calls the upstream providers. A stale entry is reported
//! as [`RateError::StaleRate`] and the caller decides whether to run a refresh
//! cycle. Only a missing entry is seeded, from the offline fallback table.

use super::currency::{CurrencyCode, get_currency};
use super::error::{RateError, Result};
use super::rates::{
    FALLBACK_SOURCE, RateEntry, RatePair, fallback_rate, is_fresh, is_valid_rate,
};
use crate::store::rates::RateCacheStore;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// A resolved rate together with the time it was observed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRate {
    pub pair: RatePair,
    pub rate: f64,
    pub updated_at: Option<DateTime<Utc>>,
    pub source: String,
}

pub struct RateResolver {
    cache: RateCacheStore,
    supported: Vec<String>,
    ttl_seconds: u64,
}

impl RateResolver {
    pub fn new(cache: RateCacheStore, supported: Vec<String>, ttl_seconds: u64) -> Self {
        Self {
            cache,
            supported,
            ttl_seconds,
        }
    }

    /// Returns the rate for `from -> to` using the configured TTL.
    pub fn resolve(&self, from: &str, to: &str) -> Result<f64> {
        Ok(self.resolve_detailed(from, to, Utc::now())?.rate)
    }

    /// Same as [`Self::resolve`] with an explicit TTL.
    pub fn resolve_with_ttl(&self, from: &str, to: &str, ttl_seconds: u64) -> Result<f64> {
        Ok(self.resolve_at(from, to, ttl_seconds, Utc::now())?.rate)
    }

    pub fn resolve_detailed(
        &self,
        from: &str,
        to: &str,
        now: DateTime<Utc>,
    ) -> Result<ResolvedRate> {
        self.resolve_at(from, to, self.ttl_seconds, now)
    }

    pub fn resolve_at(
        &self,
        from: &str,
        to: &str,
        ttl_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<ResolvedRate> {
        let pair = RatePair::new(self.validate(from)?, self.validate(to)?);

        if pair.from == pair.to {
            return Ok(ResolvedRate {
                pair,
                rate: 1.0,
                updated_at: None,
                source: "identity".to_string(),
            });
        }

        match self.cache.get(&pair)? {
            Some(entry) if is_valid_rate(entry.rate) => {
                let age = now.signed_duration_since(entry.updated_at).num_seconds();
                if is_fresh(entry.updated_at, now, ttl_seconds) {
                    debug!(pair = %pair, age, "Serving cached rate");
                    Ok(ResolvedRate {
                        pair,
                        rate: entry.rate,
                        updated_at: Some(entry.updated_at),
                        source: entry.source,
                    })
                } else {
                    debug!(pair = %pair, age, ttl_seconds, "Cached rate is stale");
                    Err(RateError::StaleRate {
                        pair: pair.key(),
                        age_secs: age,
                        ttl_secs: ttl_seconds,
                    })
                }
            }
            _ => self.seed_from_fallback(pair, now),
        }
    }

    fn seed_from_fallback(&self, pair: RatePair, now: DateTime<Utc>) -> Result<ResolvedRate> {
        let rate = fallback_rate(&pair).ok_or_else(|| RateError::RateUnavailable(pair.key()))?;
        let entry = RateEntry {
            rate,
            updated_at: now,
            source: FALLBACK_SOURCE.to_string(),
        };
        self.cache.upsert(&pair, entry)?;
        info!(pair = %pair, rate, "Seeded cache from fallback rates");
        Ok(ResolvedRate {
            pair,
            rate,
            updated_at: Some(now),
            source: FALLBACK_SOURCE.to_string(),
        })
    }

    fn validate(&self, code: &str) -> Result<CurrencyCode> {
        let currency = get_currency(code)?;
        let supported = self
            .supported
            .iter()
            .any(|c| c.eq_ignore_ascii_case(currency.code()));
        if !supported {
            return Err(RateError::CurrencyNotFound(currency.code().to_string()));
        }
        currency.code().parse()
    }
}
