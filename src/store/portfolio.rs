use super::{read_document, write_document};
use crate::core::error::{RateError, Result};
use crate::core::trade::WalletLedger;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PORTFOLIOS_FILE: &str = "portfolios.json";

type Portfolios = BTreeMap<String, BTreeMap<String, f64>>;

/// Wallet balances per user, persisted as `{ user: { CODE: balance } }`.
#[derive(Debug, Clone)]
pub struct JsonWalletStore {
    path: PathBuf,
}

impl JsonWalletStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(PORTFOLIOS_FILE))
    }

    fn load(&self) -> Result<Portfolios> {
        Ok(read_document(&self.path)?.unwrap_or_default())
    }

    /// Creates an empty portfolio for `user` if there is none yet.
    pub fn ensure_user(&self, user: &str) -> Result<()> {
        let mut portfolios = self.load()?;
        if portfolios.contains_key(user) {
            return Ok(());
        }
        portfolios.insert(user.to_string(), BTreeMap::new());
        write_document(&self.path, &portfolios)
    }
}

impl WalletLedger for JsonWalletStore {
    fn balance(&self, user: &str, code: &str) -> Result<f64> {
        Ok(self
            .load()?
            .get(user)
            .and_then(|wallets| wallets.get(code))
            .copied()
            .unwrap_or(0.0))
    }

    fn apply_deltas(&self, user: &str, deltas: &[(&str, f64)]) -> Result<Vec<f64>> {
        let mut portfolios = self.load()?;
        let wallets = portfolios.entry(user.to_string()).or_default();

        let mut balances = Vec::with_capacity(deltas.len());
        for &(code, delta) in deltas {
            let balance = wallets.entry(code.to_string()).or_insert(0.0);
            let updated = *balance + delta;
            if updated < 0.0 {
                return Err(RateError::InsufficientFunds {
                    available: *balance,
                    required: -delta,
                    code: code.to_string(),
                });
            }
            *balance = updated;
            balances.push(updated);
        }

        write_document(&self.path, &portfolios)?;
        debug!(user, ?deltas, ?balances, "Wallet balances updated");
        Ok(balances)
    }

    fn wallets(&self, user: &str) -> Result<BTreeMap<String, f64>> {
        Ok(self.load()?.remove(user).unwrap_or_default())
    }
}
