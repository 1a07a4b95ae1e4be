use super::util::{http_client, parse_json, send};
use crate::core::config::ExchangeRateProviderConfig;
use crate::core::currency::CurrencyCode;
use crate::core::error::{RateError, Result};
use crate::core::provider::{FetchedRates, RateProvider};
use crate::core::rates::{RatePair, is_valid_rate};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, instrument};

pub const EXCHANGERATE_PROVIDER: &str = "ExchangeRate-API";

/// Fiat rates from ExchangeRate-API (`/{key}/latest/{BASE}`).
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: String,
    currencies: Vec<CurrencyCode>,
    client: Client,
}

impl ExchangeRateApiProvider {
    pub fn new(
        base_url: &str,
        api_key: &str,
        currencies: &[String],
        timeout: Duration,
    ) -> Result<Self> {
        let currencies = currencies
            .iter()
            .map(|c| c.parse())
            .collect::<Result<Vec<CurrencyCode>>>()?;
        Ok(ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            currencies,
            client: http_client(EXCHANGERATE_PROVIDER, timeout)?,
        })
    }

    pub fn from_config(config: &ExchangeRateProviderConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            &config.api_key,
            &config.currencies,
            config.timeout(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    conversion_rates: Option<HashMap<String, f64>>,
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    fn name(&self) -> &str {
        EXCHANGERATE_PROVIDER
    }

    #[instrument(name = "ExchangeRateFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: &CurrencyCode) -> Result<FetchedRates> {
        let url = format!("{}/{}/latest/{}", self.base_url, self.api_key, base);
        debug!(base_url = %self.base_url, "Requesting fiat rates");

        let response = send(EXCHANGERATE_PROVIDER, self.client.get(&url)).await?;
        let status_code = response.status().as_u16();
        let data: LatestRatesResponse = parse_json(EXCHANGERATE_PROVIDER, response).await?;

        if data.result != "success" {
            return Err(RateError::provider(
                EXCHANGERATE_PROVIDER,
                format!(
                    "API error: {}",
                    data.error_type.as_deref().unwrap_or("unknown")
                ),
            ));
        }
        let conversion_rates = data.conversion_rates.ok_or_else(|| {
            RateError::provider(
                EXCHANGERATE_PROVIDER,
                "Invalid response: missing 'conversion_rates'",
            )
        })?;

        // conversion_rates holds units of CODE per one BASE
        let mut rates = BTreeMap::new();
        for code in &self.currencies {
            match conversion_rates.get(code.as_str()) {
                Some(per_base) if is_valid_rate(*per_base) => {
                    rates.insert(RatePair::new(code.clone(), base.clone()), 1.0 / per_base);
                }
                _ => debug!(code = %code, "No usable fiat rate"),
            }
        }

        Ok(FetchedRates { rates, status_code })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LATEST_PATH: &str = "/test-key/latest/USD";

    async fn mock_server(response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(LATEST_PATH))
            .respond_with(response)
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(uri: &str, timeout: Duration) -> ExchangeRateApiProvider {
        let currencies = vec!["EUR".to_string(), "GBP".to_string(), "RUB".to_string()];
        ExchangeRateApiProvider::new(uri, "test-key", &currencies, timeout).unwrap()
    }

    fn usd() -> CurrencyCode {
        "USD".parse().unwrap()
    }

    #[tokio::test]
    async fn test_successful_fetch_inverts_conversion_rates() {
        let body = r#"{
            "result": "success",
            "base_code": "USD",
            "conversion_rates": {"USD": 1, "EUR": 0.8, "GBP": 0.5, "JPY": 150.0}
        }"#;
        let server = mock_server(ResponseTemplate::new(200).set_body_string(body)).await;

        let fetched = provider(&server.uri(), Duration::from_secs(5))
            .fetch_rates(&usd())
            .await
            .unwrap();

        assert_eq!(fetched.status_code, 200);
        assert_eq!(fetched.rates.len(), 2);
        assert_eq!(fetched.rates[&"EUR_USD".parse::<RatePair>().unwrap()], 1.25);
        assert_eq!(fetched.rates[&"GBP_USD".parse::<RatePair>().unwrap()], 2.0);
        // RUB missing upstream, JPY not owned
        assert!(!fetched.rates.contains_key(&"RUB_USD".parse::<RatePair>().unwrap()));
    }

    #[tokio::test]
    async fn test_api_error_result() {
        let body = r#"{"result": "error", "error-type": "invalid-key"}"#;
        let server = mock_server(ResponseTemplate::new(200).set_body_string(body)).await;

        let err = provider(&server.uri(), Duration::from_secs(5))
            .fetch_rates(&usd())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "ExchangeRate-API request failed: API error: invalid-key"
        );
    }

    #[tokio::test]
    async fn test_missing_conversion_rates() {
        let body = r#"{"result": "success"}"#;
        let server = mock_server(ResponseTemplate::new(200).set_body_string(body)).await;

        let err = provider(&server.uri(), Duration::from_secs(5))
            .fetch_rates(&usd())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing 'conversion_rates'"));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = mock_server(ResponseTemplate::new(500)).await;

        let err = provider(&server.uri(), Duration::from_secs(5))
            .fetch_rates(&usd())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "ExchangeRate-API request failed: HTTP error: 500 Internal Server Error"
        );
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = mock_server(ResponseTemplate::new(200).set_body_string("<html>")).await;

        let err = provider(&server.uri(), Duration::from_secs(5))
            .fetch_rates(&usd())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RateError::ProviderRequest { ref provider, .. } if provider == EXCHANGERATE_PROVIDER
        ));
        assert!(err.to_string().contains("Failed to parse JSON response"));
    }

    #[tokio::test]
    async fn test_timeout_is_a_provider_error() {
        let body = r#"{"result": "success", "conversion_rates": {"EUR": 0.8}}"#;
        let server = mock_server(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .set_delay(Duration::from_millis(500)),
        )
        .await;

        let err = provider(&server.uri(), Duration::from_millis(50))
            .fetch_rates(&usd())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
    }
}
