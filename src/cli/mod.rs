pub mod portfolio;
pub mod rates;
pub mod setup;
pub mod ui;

use crate::core::config::AppConfig;
use crate::core::resolver::RateResolver;
use crate::core::updater::RatesUpdater;
use crate::providers::build_providers;
use crate::store::history::RateHistoryLog;
use crate::store::portfolio::JsonWalletStore;
use crate::store::rates::RateCacheStore;
use crate::store::session::{Session, SessionStore};
use std::path::PathBuf;

/// Everything a command handler needs, built once per process.
pub struct AppContext {
    pub config: AppConfig,
    pub data_dir: PathBuf,
    pub session: Session,
}

impl AppContext {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let data_dir = config.data_path()?;
        let session = SessionStore::in_dir(&data_dir).load();
        Ok(Self {
            config,
            data_dir,
            session,
        })
    }

    pub fn rate_cache(&self) -> RateCacheStore {
        RateCacheStore::in_dir(&self.data_dir)
    }

    pub fn history(&self) -> RateHistoryLog {
        RateHistoryLog::in_dir(&self.data_dir)
    }

    pub fn wallets(&self) -> JsonWalletStore {
        JsonWalletStore::in_dir(&self.data_dir)
    }

    pub fn sessions(&self) -> SessionStore {
        SessionStore::in_dir(&self.data_dir)
    }

    pub fn resolver(&self) -> RateResolver {
        RateResolver::new(
            self.rate_cache(),
            self.config.supported_currencies.clone(),
            self.config.rates_ttl_seconds,
        )
    }

    pub fn updater(&self) -> anyhow::Result<RatesUpdater> {
        Ok(RatesUpdater::new(
            build_providers(&self.config.providers)?,
            self.rate_cache(),
            self.history(),
            self.config.base_currency()?,
        ))
    }
}
