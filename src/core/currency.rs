//! Currency codes and the registry of known currencies

use super::error::{RateError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// A validated currency code: 2 to 5 uppercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyCode {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_uppercase();
        let valid = (2..=5).contains(&code.len()) && code.chars().all(|c| c.is_ascii_uppercase());
        if valid {
            Ok(CurrencyCode(code))
        } else {
            Err(RateError::CurrencyNotFound(s.to_string()))
        }
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = RateError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> String {
        code.0
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyKind {
    Fiat,
    Crypto,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Currency {
    Fiat {
        code: &'static str,
        name: &'static str,
        issuing_country: &'static str,
    },
    Crypto {
        code: &'static str,
        name: &'static str,
        algorithm: &'static str,
        market_cap: f64,
    },
}

impl Currency {
    /// Looks up a known currency by its uppercase code.
    pub fn lookup(code: &str) -> Option<Currency> {
        let currency = match code {
            "USD" => Currency::Fiat {
                code: "USD",
                name: "US Dollar",
                issuing_country: "United States",
            },
            "EUR" => Currency::Fiat {
                code: "EUR",
                name: "Euro",
                issuing_country: "Eurozone",
            },
            "GBP" => Currency::Fiat {
                code: "GBP",
                name: "Pound Sterling",
                issuing_country: "United Kingdom",
            },
            "RUB" => Currency::Fiat {
                code: "RUB",
                name: "Russian Ruble",
                issuing_country: "Russia",
            },
            "BTC" => Currency::Crypto {
                code: "BTC",
                name: "Bitcoin",
                algorithm: "SHA-256",
                market_cap: 1.12e12,
            },
            "ETH" => Currency::Crypto {
                code: "ETH",
                name: "Ethereum",
                algorithm: "Ethash",
                market_cap: 4.5e11,
            },
            "SOL" => Currency::Crypto {
                code: "SOL",
                name: "Solana",
                algorithm: "Proof of History",
                market_cap: 0.0,
            },
            _ => return None,
        };
        Some(currency)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Fiat { code, .. } | Currency::Crypto { code, .. } => code,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Currency::Fiat { name, .. } | Currency::Crypto { name, .. } => name,
        }
    }

    pub fn kind(&self) -> CurrencyKind {
        match self {
            Currency::Fiat { .. } => CurrencyKind::Fiat,
            Currency::Crypto { .. } => CurrencyKind::Crypto,
        }
    }

    pub fn display_info(&self) -> String {
        match self {
            Currency::Fiat {
                code,
                name,
                issuing_country,
            } => format!("[FIAT] {code} — {name} (Issuing: {issuing_country})"),
            Currency::Crypto {
                code,
                name,
                algorithm,
                market_cap,
            } => {
                let mcap = if *market_cap > 0.0 {
                    format!("{market_cap:.2e}")
                } else {
                    "N/A".to_string()
                };
                format!("[CRYPTO] {code} — {name} (Algo: {algorithm}, MCAP: {mcap})")
            }
        }
    }
}

/// Resolves a user supplied code to a known currency.
pub fn get_currency(code: &str) -> Result<Currency> {
    let upper = code.trim().to_uppercase();
    Currency::lookup(&upper).ok_or(RateError::CurrencyNotFound(upper))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_code_validation() {
        assert_eq!("eur".parse::<CurrencyCode>().unwrap().as_str(), "EUR");
        assert_eq!("DOGE".parse::<CurrencyCode>().unwrap().as_str(), "DOGE");
        assert!("E".parse::<CurrencyCode>().is_err());
        assert!("TOOLONG".parse::<CurrencyCode>().is_err());
        assert!("US1".parse::<CurrencyCode>().is_err());
        assert!("U D".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_get_currency() {
        let usd = get_currency("usd").unwrap();
        assert_eq!(usd.code(), "USD");
        assert_eq!(usd.kind(), CurrencyKind::Fiat);

        let btc = get_currency("BTC").unwrap();
        assert_eq!(btc.kind(), CurrencyKind::Crypto);
        assert_eq!(btc.name(), "Bitcoin");

        let err = get_currency("xyz").unwrap_err();
        assert!(matches!(err, RateError::CurrencyNotFound(ref code) if code == "XYZ"));
    }

    #[test]
    fn test_display_info() {
        assert_eq!(
            get_currency("USD").unwrap().display_info(),
            "[FIAT] USD — US Dollar (Issuing: United States)"
        );
        assert_eq!(
            get_currency("BTC").unwrap().display_info(),
            "[CRYPTO] BTC — Bitcoin (Algo: SHA-256, MCAP: 1.12e12)"
        );
        assert!(get_currency("SOL").unwrap().display_info().ends_with("MCAP: N/A)"));
    }
}
