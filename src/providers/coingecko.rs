use super::util::{http_client, parse_json, send};
use crate::core::config::CoinGeckoProviderConfig;
use crate::core::currency::CurrencyCode;
use crate::core::error::{RateError, Result};
use crate::core::provider::{FetchedRates, RateProvider};
use crate::core::rates::{RatePair, is_valid_rate};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, instrument};

pub const COINGECKO_PROVIDER: &str = "CoinGecko";

const API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Crypto prices from CoinGecko's `/simple/price` endpoint.
pub struct CoinGeckoProvider {
    base_url: String,
    api_key: Option<String>,
    /// Owned codes with their CoinGecko coin ids, in configuration order.
    coins: Vec<(CurrencyCode, String)>,
    client: Client,
}

impl CoinGeckoProvider {
    pub fn new(
        base_url: &str,
        api_key: &str,
        coins: &[(String, String)],
        timeout: Duration,
    ) -> Result<Self> {
        let coins = coins
            .iter()
            .map(|(code, id)| Ok((code.parse::<CurrencyCode>()?, id.clone())))
            .collect::<Result<Vec<_>>>()?;
        Ok(CoinGeckoProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: (!api_key.is_empty()).then(|| api_key.to_string()),
            coins,
            client: http_client(COINGECKO_PROVIDER, timeout)?,
        })
    }

    /// Codes without an id are skipped; config validation rejects them earlier.
    pub fn from_config(config: &CoinGeckoProviderConfig) -> Result<Self> {
        let coins: Vec<(String, String)> = config
            .currencies
            .iter()
            .filter_map(|code| config.ids.get(code).map(|id| (code.clone(), id.clone())))
            .collect();
        Self::new(&config.base_url, &config.api_key, &coins, config.timeout())
    }
}

#[async_trait]
impl RateProvider for CoinGeckoProvider {
    fn name(&self) -> &str {
        COINGECKO_PROVIDER
    }

    #[instrument(name = "CoinGeckoFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: &CurrencyCode) -> Result<FetchedRates> {
        let ids = self
            .coins
            .iter()
            .map(|(_, id)| id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let vs_currency = base.as_str().to_lowercase();
        let url = Url::parse_with_params(
            &format!("{}/simple/price", self.base_url),
            &[("ids", ids.as_str()), ("vs_currencies", vs_currency.as_str())],
        )
        .map_err(|e| RateError::provider(COINGECKO_PROVIDER, format!("Invalid URL: {e}")))?;
        debug!(%url, "Requesting crypto rates");

        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = send(COINGECKO_PROVIDER, request).await?;
        let status_code = response.status().as_u16();
        let data: HashMap<String, HashMap<String, f64>> =
            parse_json(COINGECKO_PROVIDER, response).await?;

        let mut rates = BTreeMap::new();
        for (code, id) in &self.coins {
            match data.get(id).and_then(|prices| prices.get(&vs_currency)) {
                Some(price) if is_valid_rate(*price) => {
                    rates.insert(RatePair::new(code.clone(), base.clone()), *price);
                }
                _ => debug!(code = %code, id, "No usable crypto price"),
            }
        }

        Ok(FetchedRates { rates, status_code })
    }
}
