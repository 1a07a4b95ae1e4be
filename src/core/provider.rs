//! Upstream rate source abstraction

use super::currency::CurrencyCode;
use super::error::Result;
use super::rates::RatePair;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Rates returned by one successful provider request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedRates {
    pub rates: BTreeMap<RatePair, f64>,
    pub status_code: u16,
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Name recorded as the `source` of every rate this provider returns.
    fn name(&self) -> &str;

    /// Fetches `CODE_BASE` rates for the codes this provider owns.
    /// Codes the upstream cannot quote are omitted.
    async fn fetch_rates(&self, base: &CurrencyCode) -> Result<FetchedRates>;
}
