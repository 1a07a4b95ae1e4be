use super::currency::{Currency, CurrencyCode, CurrencyKind};
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const EXCHANGERATE_API_KEY_ENV: &str = "EXCHANGERATE_API_KEY";
pub const COINGECKO_API_KEY_ENV: &str = "COINGECKO_API_KEY";

fn default_ttl_seconds() -> u64 {
    300
}

fn default_base() -> String {
    "USD".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_supported_currencies() -> Vec<String> {
    ["USD", "EUR", "GBP", "RUB", "BTC", "ETH", "SOL"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub currencies: Vec<String>,
}

impl Default for ExchangeRateProviderConfig {
    fn default() -> Self {
        ExchangeRateProviderConfig {
            base_url: "https://v6.exchangerate-api.com/v6".to_string(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            currencies: vec!["EUR".to_string(), "GBP".to_string(), "RUB".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    pub currencies: Vec<String>,
    /// Maps currency codes to CoinGecko coin ids.
    pub ids: BTreeMap<String, String>,
}

impl Default for CoinGeckoProviderConfig {
    fn default() -> Self {
        CoinGeckoProviderConfig {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            currencies: vec!["BTC".to_string(), "ETH".to_string(), "SOL".to_string()],
            ids: [("BTC", "bitcoin"), ("ETH", "ethereum"), ("SOL", "solana")]
                .iter()
                .map(|(code, id)| (code.to_string(), id.to_string()))
                .collect(),
        }
    }
}

impl ExchangeRateProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CoinGeckoProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub exchangerate: ExchangeRateProviderConfig,
    #[serde(default)]
    pub coingecko: CoinGeckoProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub data_dir: Option<String>,
    #[serde(default = "default_ttl_seconds")]
    pub rates_ttl_seconds: u64,
    #[serde(default = "default_base")]
    pub default_base: String,
    #[serde(default = "default_supported_currencies")]
    pub supported_currencies: Vec<String>,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_dir: None,
            rates_ttl_seconds: default_ttl_seconds(),
            default_base: default_base(),
            supported_currencies: default_supported_currencies(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults
    /// when no file has been created yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(path = %config_path.display(), "No config file, using defaults");
            let mut config = Self::default();
            config.apply_env_overrides();
            config.validate()?;
            return Ok(config);
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "valutrade", "valutrade")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_dir {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "valutrade", "valutrade")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.apply_env_overrides();
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// API keys from the environment take precedence over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(EXCHANGERATE_API_KEY_ENV) {
            self.providers.exchangerate.api_key = key;
        }
        if let Ok(key) = std::env::var(COINGECKO_API_KEY_ENV) {
            self.providers.coingecko.api_key = key;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.rates_ttl_seconds == 0 {
            bail!("rates_ttl_seconds must be positive");
        }
        known_currency(&self.default_base)?;
        for code in &self.supported_currencies {
            known_currency(code)?;
        }
        for code in &self.providers.exchangerate.currencies {
            if known_currency(code)?.kind() != CurrencyKind::Fiat {
                bail!("ExchangeRate-API can only own fiat currencies, got {code}");
            }
        }
        for code in &self.providers.coingecko.currencies {
            if known_currency(code)?.kind() != CurrencyKind::Crypto {
                bail!("CoinGecko can only own crypto currencies, got {code}");
            }
            if !self.providers.coingecko.ids.contains_key(code) {
                bail!("No CoinGecko id configured for {code}");
            }
        }
        Ok(())
    }

    pub fn is_supported(&self, code: &CurrencyCode) -> bool {
        self.supported_currencies
            .iter()
            .any(|c| c.eq_ignore_ascii_case(code.as_str()))
    }

    pub fn base_currency(&self) -> Result<CurrencyCode> {
        Ok(self.default_base.parse()?)
    }
}

fn known_currency(code: &str) -> Result<Currency> {
    Currency::lookup(code).with_context(|| format!("Unknown currency in config: {code}"))
}
