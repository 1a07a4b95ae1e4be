use crate::core::error::{RateError, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Builds a client whose requests fail after `timeout`.
pub fn http_client(provider: &str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent("valutrade/0.1")
        .timeout(timeout)
        .build()
        .map_err(|e| RateError::provider(provider, format!("Failed to build HTTP client: {e}")))
}

/// Sends a request and turns transport failures, timeouts and non-success
/// statuses into provider errors.
pub async fn send(provider: &str, request: reqwest::RequestBuilder) -> Result<Response> {
    let response = request.send().await.map_err(|e| {
        let reason = if e.is_timeout() {
            format!("Request timed out: {e}")
        } else {
            format!("Request error: {e}")
        };
        RateError::provider(provider, reason)
    })?;

    debug!(provider, status = %response.status(), "Received response");

    if !response.status().is_success() {
        return Err(RateError::provider(
            provider,
            format!("HTTP error: {}", response.status()),
        ));
    }
    Ok(response)
}

/// Reads the body and parses it as JSON.
pub async fn parse_json<T: DeserializeOwned>(provider: &str, response: Response) -> Result<T> {
    let text = response.text().await.map_err(|e| {
        RateError::provider(provider, format!("Failed to read response body: {e}"))
    })?;
    serde_json::from_str(&text)
        .map_err(|e| RateError::provider(provider, format!("Failed to parse JSON response: {e}")))
}
