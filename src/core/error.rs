//! Error taxonomy for rate resolution, refresh cycles and wallet operations

use thiserror::Error;

pub type Result<T, E = RateError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum RateError {
    #[error("Unknown currency '{0}'")]
    CurrencyNotFound(String),

    #[error("{provider} request failed: {reason}")]
    ProviderRequest { provider: String, reason: String },

    #[error("Rate {pair} is stale: updated {age_secs}s ago, ttl is {ttl_secs}s")]
    StaleRate {
        pair: String,
        age_secs: i64,
        ttl_secs: u64,
    },

    #[error("Rate {0} is unavailable")]
    RateUnavailable(String),

    #[error("Insufficient funds: available {available} {code}, required {required} {code}")]
    InsufficientFunds {
        available: f64,
        required: f64,
        code: String,
    },

    #[error("Amount must be a positive number, got {0}")]
    InvalidAmount(f64),

    #[error("Unknown rate provider '{0}'")]
    UnknownProvider(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Storage error for {path}: {source}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed document {path}: {source}")]
    Serialization {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl RateError {
    pub fn provider(provider: &str, reason: impl Into<String>) -> Self {
        RateError::ProviderRequest {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }

    /// Short stable name of the failure, used in action logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RateError::CurrencyNotFound(_) => "CurrencyNotFoundError",
            RateError::ProviderRequest { .. } => "ProviderRequestError",
            RateError::StaleRate { .. } => "StaleRateError",
            RateError::RateUnavailable(_) => "RateUnavailableError",
            RateError::InsufficientFunds { .. } => "InsufficientFundsError",
            RateError::InvalidAmount(_) => "InvalidAmountError",
            RateError::UnknownProvider(_) => "UnknownProviderError",
            RateError::NotLoggedIn => "NotLoggedInError",
            RateError::Storage { .. } => "StorageError",
            RateError::Serialization { .. } => "SerializationError",
        }
    }
}
