pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::AppContext;
use crate::core::config::AppConfig;
use anyhow::Result;
use std::time::Duration;
use tracing::{debug, info};

/// Commands that run against a loaded configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    UpdateRates {
        source: Option<String>,
    },
    Schedule {
        interval_secs: Option<u64>,
        cycles: Option<u64>,
    },
    ShowRates {
        currency: Option<String>,
    },
    GetRate {
        from: String,
        to: String,
    },
    Login {
        username: String,
    },
    Logout,
    ShowPortfolio {
        base: Option<String>,
    },
    Buy {
        currency: String,
        amount: f64,
    },
    Sell {
        currency: String,
        amount: f64,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("valutrade starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    let ctx = AppContext::new(config)?;
    debug!(
        data_dir = %ctx.data_dir.display(),
        ttl = ctx.config.rates_ttl_seconds,
        base = %ctx.config.default_base,
        "Loaded config"
    );

    match command {
        AppCommand::UpdateRates { source } => {
            cli::rates::update(&ctx, source.as_deref()).await?;
            Ok(())
        }
        AppCommand::Schedule {
            interval_secs,
            cycles,
        } => {
            let interval =
                Duration::from_secs(interval_secs.unwrap_or(ctx.config.rates_ttl_seconds).max(1));
            cli::rates::schedule(&ctx, interval, cycles).await
        }
        AppCommand::ShowRates { currency } => cli::rates::show(&ctx, currency.as_deref()),
        AppCommand::GetRate { from, to } => cli::rates::get_rate(&ctx, &from, &to),
        AppCommand::Login { username } => cli::portfolio::login(&ctx, &username),
        AppCommand::Logout => cli::portfolio::logout(&ctx),
        AppCommand::ShowPortfolio { base } => cli::portfolio::show(&ctx, base.as_deref()),
        AppCommand::Buy { currency, amount } => cli::portfolio::buy(&ctx, &currency, amount),
        AppCommand::Sell { currency, amount } => cli::portfolio::sell(&ctx, &currency, amount),
    }
}
