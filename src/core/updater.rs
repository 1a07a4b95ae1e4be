//! Runs refresh cycles across the configured rate providers.

use super::currency::CurrencyCode;
use super::error::{RateError, Result};
use super::provider::{FetchedRates, RateProvider};
use super::rates::{
    HistoryEntry, HistoryMeta, RateEntry, RatePair, UPDATER_SOURCE, is_valid_rate,
};
use crate::store::history::RateHistoryLog;
use crate::store::rates::RateCacheStore;
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{error, info, warn};

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Pairs written to the cache.
    pub updated: usize,
    /// Providers that failed.
    pub errors: usize,
}

struct Observation<'a> {
    pair: RatePair,
    rate: f64,
    source: &'a str,
    meta: HistoryMeta,
}

pub struct RatesUpdater {
    providers: Vec<Box<dyn RateProvider>>,
    cache: RateCacheStore,
    history: RateHistoryLog,
    base: CurrencyCode,
}

impl RatesUpdater {
    pub fn new(
        providers: Vec<Box<dyn RateProvider>>,
        cache: RateCacheStore,
        history: RateHistoryLog,
        base: CurrencyCode,
    ) -> Self {
        Self {
            providers,
            cache,
            history,
            base,
        }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    fn find_provider(&self, name: &str) -> Result<&dyn RateProvider> {
        self.providers
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .map(|p| p.as_ref())
            .ok_or_else(|| RateError::UnknownProvider(name.to_string()))
    }

    /// Refreshes rates from every provider.
    pub async fn run_update(&self) -> Result<UpdateSummary> {
        let providers: Vec<&dyn RateProvider> =
            self.providers.iter().map(|p| p.as_ref()).collect();
        self.run_cycle(&providers).await
    }

    /// Refreshes rates from a single provider, persisting them like a full cycle.
    pub async fn run_update_for(&self, name: &str) -> Result<UpdateSummary> {
        let provider = self.find_provider(name)?;
        self.run_cycle(&[provider]).await
    }

    /// Queries one provider without touching the cache or the history.
    pub async fn fetch_from_provider(
        &self,
        name: &str,
        base: &CurrencyCode,
    ) -> Result<FetchedRates> {
        self.find_provider(name)?.fetch_rates(base).await
    }

    async fn run_cycle(&self, providers: &[&dyn RateProvider]) -> Result<UpdateSummary> {
        info!(providers = providers.len(), base = %self.base, "Starting rates update");

        // join_all yields results in provider order, keeping the merge deterministic
        let fetches = providers.iter().map(|provider| async move {
            let started = Instant::now();
            let result = provider.fetch_rates(&self.base).await;
            (*provider, started.elapsed(), result)
        });
        let results = join_all(fetches).await;

        let mut merged: Vec<Observation> = Vec::new();
        let mut positions: HashMap<RatePair, usize> = HashMap::new();
        let mut errors = 0;

        for (provider, elapsed, result) in results {
            let fetched = match result {
                Ok(fetched) => fetched,
                Err(e) => {
                    error!(provider = provider.name(), error = %e, "Provider fetch failed");
                    errors += 1;
                    continue;
                }
            };
            info!(
                provider = provider.name(),
                count = fetched.rates.len(),
                "Fetched rates"
            );

            let meta = HistoryMeta {
                request_ms: elapsed.as_millis() as u64,
                status_code: fetched.status_code,
            };
            for (pair, rate) in fetched.rates {
                if !is_valid_rate(rate) {
                    warn!(provider = provider.name(), pair = %pair, rate, "Dropping invalid rate");
                    continue;
                }
                let observation = Observation {
                    pair: pair.clone(),
                    rate,
                    source: provider.name(),
                    meta: meta.clone(),
                };
                match positions.get(&pair) {
                    Some(&index) => merged[index] = observation,
                    None => {
                        positions.insert(pair, merged.len());
                        merged.push(observation);
                    }
                }
            }
        }

        if merged.is_empty() {
            warn!(errors, "No rates fetched, nothing saved");
            return Ok(UpdateSummary { updated: 0, errors });
        }

        let timestamp = Utc::now();
        self.cache.merge(
            merged.iter().map(|o| {
                let entry = RateEntry {
                    rate: o.rate,
                    updated_at: timestamp,
                    source: o.source.to_string(),
                };
                (o.pair.clone(), entry)
            }),
            timestamp,
            UPDATER_SOURCE,
        )?;
        self.history.append_all(
            merged
                .iter()
                .map(|o| HistoryEntry::new(&o.pair, o.rate, timestamp, o.source, o.meta.clone())),
        )?;

        info!(updated = merged.len(), errors, "Saved rates to cache and history");
        Ok(UpdateSummary {
            updated: merged.len(),
            errors,
        })
    }
}
