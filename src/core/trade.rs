//! Buy/sell flows and portfolio valuation over a wallet ledger.

use super::currency::get_currency;
use super::error::{RateError, Result};
use super::resolver::RateResolver;
use std::collections::BTreeMap;
use std::fmt::Display;

/// Currency that sells are settled in and buys are priced in.
pub const SETTLEMENT_CURRENCY: &str = "USD";

/// Wallet balances owned outside the rate subsystem.
pub trait WalletLedger {
    fn balance(&self, user: &str, code: &str) -> Result<f64>;

    /// Applies every `(code, delta)` in order as a single write and returns
    /// the new balances. Nothing is saved if any balance would go negative.
    fn apply_deltas(&self, user: &str, deltas: &[(&str, f64)]) -> Result<Vec<f64>>;

    /// Adds `delta` to the balance and returns the new balance.
    fn apply_delta(&self, user: &str, code: &str, delta: f64) -> Result<f64> {
        let balances = self.apply_deltas(user, &[(code, delta)])?;
        Ok(balances.first().copied().unwrap_or_default())
    }

    fn wallets(&self, user: &str) -> Result<BTreeMap<String, f64>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeReceipt {
    pub code: String,
    pub amount: f64,
    pub rate: f64,
    pub old_balance: f64,
    pub new_balance: f64,
    pub settlement_value: f64,
}

impl Display for TradeReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.4} {} at {:.2} {}/{}, balance {:.4} -> {:.4}, value {:.2} {}",
            self.amount,
            self.code,
            self.rate,
            SETTLEMENT_CURRENCY,
            self.code,
            self.old_balance,
            self.new_balance,
            self.settlement_value,
            SETTLEMENT_CURRENCY
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WalletValue {
    pub code: String,
    pub balance: f64,
    pub value: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioValuation {
    pub base: String,
    pub wallets: Vec<WalletValue>,
    /// Sum over the wallets whose rate resolved.
    pub total: f64,
}

impl Display for PortfolioValuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} wallets, total {:.2} {}",
            self.wallets.len(),
            self.total,
            self.base
        )
    }
}

pub struct TradeService<'a, L: WalletLedger> {
    ledger: &'a L,
    resolver: &'a RateResolver,
}

fn validate_amount(amount: f64) -> Result<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(RateError::InvalidAmount(amount))
    }
}

impl<'a, L: WalletLedger> TradeService<'a, L> {
    pub fn new(ledger: &'a L, resolver: &'a RateResolver) -> Self {
        Self { ledger, resolver }
    }

    /// Credits `amount` of `code` to the user's wallet.
    pub fn buy(&self, user: &str, code: &str, amount: f64) -> Result<TradeReceipt> {
        validate_amount(amount)?;
        let code = get_currency(code)?.code();
        let rate = self.resolver.resolve(code, SETTLEMENT_CURRENCY)?;

        let old_balance = self.ledger.balance(user, code)?;
        let new_balance = self.ledger.apply_delta(user, code, amount)?;

        Ok(TradeReceipt {
            code: code.to_string(),
            amount,
            rate,
            old_balance,
            new_balance,
            settlement_value: amount * rate,
        })
    }

    /// Debits `amount` of `code` and credits the proceeds to the settlement wallet.
    pub fn sell(&self, user: &str, code: &str, amount: f64) -> Result<TradeReceipt> {
        validate_amount(amount)?;
        let code = get_currency(code)?.code();

        let old_balance = self.ledger.balance(user, code)?;
        if amount > old_balance {
            return Err(RateError::InsufficientFunds {
                available: old_balance,
                required: amount,
                code: code.to_string(),
            });
        }
        let rate = self.resolver.resolve(code, SETTLEMENT_CURRENCY)?;

        let proceeds = amount * rate;
        let mut deltas = vec![(code, -amount)];
        if code != SETTLEMENT_CURRENCY {
            deltas.push((SETTLEMENT_CURRENCY, proceeds));
        }
        let balances = self.ledger.apply_deltas(user, &deltas)?;
        let new_balance = balances.first().copied().unwrap_or(old_balance - amount);

        Ok(TradeReceipt {
            code: code.to_string(),
            amount,
            rate,
            old_balance,
            new_balance,
            settlement_value: proceeds,
        })
    }

    /// Values every wallet in `base`. Wallets whose rate does not resolve are
    /// reported with their error and left out of the total.
    pub fn portfolio_value(&self, user: &str, base: &str) -> Result<PortfolioValuation> {
        let base = get_currency(base)?.code();
        let mut wallets = Vec::new();
        let mut total = 0.0;

        for (code, balance) in self.ledger.wallets(user)? {
            let (value, error) = match self.resolver.resolve(&code, base) {
                Ok(rate) => {
                    let value = balance * rate;
                    total += value;
                    (Some(value), None)
                }
                Err(e) => (None, Some(e.to_string())),
            };
            wallets.push(WalletValue {
                code,
                balance,
                value,
                error,
            });
        }

        Ok(PortfolioValuation {
            base: base.to_string(),
            wallets,
            total,
        })
    }
}
