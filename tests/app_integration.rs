use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::info;
use valutrade::AppCommand;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const FIAT_BODY: &str = r#"{
        "result": "success",
        "base_code": "USD",
        "conversion_rates": {"USD": 1, "EUR": 0.8, "GBP": 0.5, "RUB": 100.0}
    }"#;

    pub const CRYPTO_BODY: &str = r#"{
        "bitcoin": {"usd": 60000.0},
        "ethereum": {"usd": 3000.0},
        "solana": {"usd": 150.0}
    }"#;

    pub async fn create_fiat_server(response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        // The key segment may come from EXCHANGERATE_API_KEY in the environment
        Mock::given(method("GET"))
            .and(path_regex(r"^/[^/]+/latest/USD$"))
            .respond_with(response)
            .mount(&mock_server)
            .await;
        mock_server
    }

    pub async fn create_crypto_server(response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .and(query_param("vs_currencies", "usd"))
            .respond_with(response)
            .mount(&mock_server)
            .await;
        mock_server
    }

    pub fn ok(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_string(body.to_string())
    }
}

fn write_config(dir: &Path, fiat_uri: &str, crypto_uri: &str) -> String {
    let data_dir = dir.join("data");
    let config_content = format!(
        r#"
data_dir: "{}"
rates_ttl_seconds: 300
default_base: USD
providers:
  exchangerate:
    base_url: "{fiat_uri}"
    api_key: "test-key"
    timeout_secs: 5
    currencies: [EUR, GBP, RUB]
  coingecko:
    base_url: "{crypto_uri}"
    timeout_secs: 5
    currencies: [BTC, ETH, SOL]
    ids:
      BTC: bitcoin
      ETH: ethereum
      SOL: solana
"#,
        data_dir.display()
    );
    let config_path = dir.join("config.yaml");
    fs::write(&config_path, config_content).expect("Failed to write config");
    config_path.to_string_lossy().to_string()
}

fn read_json(path: &Path) -> serde_json::Value {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {e}", path.display()));
    serde_json::from_str(&content).expect("Invalid JSON")
}

fn approx(value: &serde_json::Value, expected: f64) -> bool {
    value
        .as_f64()
        .is_some_and(|v| (v - expected).abs() < 1e-9)
}

#[test_log::test(tokio::test)]
async fn test_update_rates_writes_cache_and_history() {
    let fiat = test_utils::create_fiat_server(test_utils::ok(test_utils::FIAT_BODY)).await;
    let crypto = test_utils::create_crypto_server(test_utils::ok(test_utils::CRYPTO_BODY)).await;

    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &fiat.uri(), &crypto.uri());

    let result = valutrade::run_command(
        AppCommand::UpdateRates { source: None },
        Some(config_path.as_str()),
    )
    .await;
    assert!(result.is_ok(), "update-rates failed: {result:?}");

    let data_dir = temp_dir.path().join("data");
    let cache = read_json(&data_dir.join("rates.json"));
    info!(%cache, "Rates cache after update");

    assert!(approx(&cache["EUR_USD"]["rate"], 1.25));
    assert!(approx(&cache["GBP_USD"]["rate"], 2.0));
    assert!(approx(&cache["RUB_USD"]["rate"], 0.01));
    assert!(approx(&cache["BTC_USD"]["rate"], 60000.0));
    assert!(approx(&cache["SOL_USD"]["rate"], 150.0));
    assert_eq!(cache["EUR_USD"]["source"], "ExchangeRate-API");
    assert_eq!(cache["ETH_USD"]["source"], "CoinGecko");
    assert_eq!(cache["source"], "ParserService");
    assert!(cache["last_refresh"].is_string());

    // Every pair of one cycle shares a timestamp
    assert_eq!(cache["EUR_USD"]["updated_at"], cache["BTC_USD"]["updated_at"]);

    let history = read_json(&data_dir.join("exchange_rates.json"));
    let entries = history.as_array().expect("History should be a list");
    assert_eq!(entries.len(), 6);
    assert_eq!(entries[0]["from_currency"], "EUR");
    assert_eq!(entries[0]["to_currency"], "USD");
    assert_eq!(entries[5]["from_currency"], "SOL");
    assert!(entries[0]["id"].as_str().unwrap().starts_with("EUR_USD_"));
    assert_eq!(entries[0]["meta"]["status_code"], 200);
}

#[test_log::test(tokio::test)]
async fn test_partial_provider_failure_keeps_successful_rates() {
    let fiat = test_utils::create_fiat_server(test_utils::ok(test_utils::FIAT_BODY)).await;
    let crypto = test_utils::create_crypto_server(
        wiremock::ResponseTemplate::new(500).set_body_string("Internal Server Error"),
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &fiat.uri(), &crypto.uri());

    valutrade::run_command(AppCommand::UpdateRates { source: None }, Some(config_path.as_str()))
        .await
        .expect("A single failed provider should not fail the cycle");

    let data_dir = temp_dir.path().join("data");
    let cache = read_json(&data_dir.join("rates.json"));
    assert!(approx(&cache["EUR_USD"]["rate"], 1.25));
    assert!(cache.get("BTC_USD").is_none());

    let history = read_json(&data_dir.join("exchange_rates.json"));
    assert_eq!(history.as_array().map(Vec::len), Some(3));
}

#[test_log::test(tokio::test)]
async fn test_all_providers_failing_writes_nothing() {
    let fiat = test_utils::create_fiat_server(
        wiremock::ResponseTemplate::new(200)
            .set_body_string(r#"{"result": "error", "error-type": "invalid-key"}"#),
    )
    .await;
    let crypto =
        test_utils::create_crypto_server(wiremock::ResponseTemplate::new(429)).await;

    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &fiat.uri(), &crypto.uri());

    valutrade::run_command(AppCommand::UpdateRates { source: None }, Some(config_path.as_str()))
        .await
        .expect("Update should report failures without erroring");

    let data_dir = temp_dir.path().join("data");
    assert!(!data_dir.join("rates.json").exists());
    assert!(!data_dir.join("exchange_rates.json").exists());
}

#[test_log::test(tokio::test)]
async fn test_update_single_source() {
    let fiat = test_utils::create_fiat_server(test_utils::ok(test_utils::FIAT_BODY)).await;
    let crypto = test_utils::create_crypto_server(test_utils::ok(test_utils::CRYPTO_BODY)).await;

    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &fiat.uri(), &crypto.uri());

    valutrade::run_command(
        AppCommand::UpdateRates {
            source: Some("coingecko".to_string()),
        },
        Some(config_path.as_str()),
    )
    .await
    .unwrap();

    let cache = read_json(&temp_dir.path().join("data").join("rates.json"));
    assert!(approx(&cache["ETH_USD"]["rate"], 3000.0));
    assert!(cache.get("EUR_USD").is_none());

    let unknown = valutrade::run_command(
        AppCommand::UpdateRates {
            source: Some("Bloomberg".to_string()),
        },
        Some(config_path.as_str()),
    )
    .await;
    assert!(unknown.unwrap_err().to_string().contains("Bloomberg"));
}

#[test_log::test(tokio::test)]
async fn test_get_rate_after_update() {
    let fiat = test_utils::create_fiat_server(test_utils::ok(test_utils::FIAT_BODY)).await;
    let crypto = test_utils::create_crypto_server(test_utils::ok(test_utils::CRYPTO_BODY)).await;

    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &fiat.uri(), &crypto.uri());

    valutrade::run_command(AppCommand::UpdateRates { source: None }, Some(config_path.as_str()))
        .await
        .unwrap();

    let get = |from: &str, to: &str| AppCommand::GetRate {
        from: from.to_string(),
        to: to.to_string(),
    };
    assert!(
        valutrade::run_command(get("eur", "usd"), Some(config_path.as_str()))
            .await
            .is_ok()
    );
    assert!(
        valutrade::run_command(get("BTC", "USD"), Some(config_path.as_str()))
            .await
            .is_ok()
    );
    assert!(
        valutrade::run_command(get("XYZ", "USD"), Some(config_path.as_str()))
            .await
            .is_err()
    );
    assert!(
        valutrade::run_command(AppCommand::ShowRates { currency: None }, Some(config_path.as_str()))
            .await
            .is_ok()
    );
}

#[test_log::test(tokio::test)]
async fn test_trading_flow() {
    let fiat = test_utils::create_fiat_server(test_utils::ok(test_utils::FIAT_BODY)).await;
    let crypto = test_utils::create_crypto_server(test_utils::ok(test_utils::CRYPTO_BODY)).await;

    let temp_dir = TempDir::new().unwrap();
    let config_path = write_config(temp_dir.path(), &fiat.uri(), &crypto.uri());
    let run = |cmd: AppCommand| valutrade::run_command(cmd, Some(config_path.as_str()));

    run(AppCommand::UpdateRates { source: None }).await.unwrap();

    let buy = AppCommand::Buy {
        currency: "EUR".to_string(),
        amount: 100.0,
    };
    assert!(run(buy.clone()).await.is_err(), "Trading requires a session");

    run(AppCommand::Login {
        username: "alice".to_string(),
    })
    .await
    .unwrap();
    run(buy).await.unwrap();
    run(AppCommand::Sell {
        currency: "EUR".to_string(),
        amount: 40.0,
    })
    .await
    .unwrap();

    let oversell = run(AppCommand::Sell {
        currency: "EUR".to_string(),
        amount: 1000.0,
    })
    .await;
    assert!(oversell.unwrap_err().to_string().contains("Insufficient funds"));

    let portfolios = read_json(&temp_dir.path().join("data").join("portfolios.json"));
    assert!(approx(&portfolios["alice"]["EUR"], 60.0));
    assert!(approx(&portfolios["alice"]["USD"], 50.0));

    run(AppCommand::ShowPortfolio { base: None }).await.unwrap();
    run(AppCommand::Logout).await.unwrap();
    assert!(
        run(AppCommand::ShowPortfolio { base: None })
            .await
            .is_err()
    );
}
