pub mod coingecko;
pub mod exchangerate;
pub mod util;

use crate::core::config::ProvidersConfig;
use crate::core::error::Result;
use crate::core::provider::RateProvider;
use coingecko::CoinGeckoProvider;
use exchangerate::ExchangeRateApiProvider;

/// Builds the configured upstream sources in refresh order: fiat, then crypto.
pub fn build_providers(config: &ProvidersConfig) -> Result<Vec<Box<dyn RateProvider>>> {
    Ok(vec![
        Box::new(ExchangeRateApiProvider::from_config(&config.exchangerate)?),
        Box::new(CoinGeckoProvider::from_config(&config.coingecko)?),
    ])
}
