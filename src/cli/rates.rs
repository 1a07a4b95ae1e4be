use super::{AppContext, ui};
use crate::core::currency::get_currency;
use crate::core::error::RateError;
use crate::core::rates::{RateCacheDocument, RatePair, is_fresh, is_valid_rate};
use crate::store::rates::RateCacheStore;
use crate::core::updater::{RatesUpdater, UpdateSummary};
use anyhow::Result;
use chrono::{DateTime, Utc};
use comfy_table::{Cell, Table};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

fn render_summary(summary: &UpdateSummary) -> String {
    let status = if summary.updated == 0 {
        ui::style_text("Rates update saved nothing", ui::StyleType::Error)
    } else {
        ui::style_text(
            &format!("Updated {} rates", summary.updated),
            ui::StyleType::TotalValue,
        )
    };
    if summary.errors > 0 {
        format!(
            "{status} ({} provider(s) failed, run with --verbose for details)",
            summary.errors
        )
    } else {
        status
    }
}

async fn run_cycle(updater: &RatesUpdater, source: Option<&str>) -> Result<UpdateSummary> {
    let pb = ui::new_spinner("Fetching rates...");
    let result = match source {
        Some(name) => updater.run_update_for(name).await,
        None => updater.run_update().await,
    };
    pb.finish_and_clear();
    if let Err(RateError::UnknownProvider(_)) = &result {
        eprintln!(
            "{}",
            ui::style_text(
                &format!("Known providers: {}", updater.provider_names().join(", ")),
                ui::StyleType::Subtle
            )
        );
    }
    Ok(result?)
}

/// Runs one refresh cycle, optionally limited to a single provider.
pub async fn update(ctx: &AppContext, source: Option<&str>) -> Result<UpdateSummary> {
    let updater = ctx.updater()?;
    let summary = run_cycle(&updater, source).await?;
    println!("{}", render_summary(&summary));
    if let Some(last_refresh) = ctx.rate_cache().load()?.last_refresh {
        println!(
            "{}",
            ui::style_text(
                &format!("Last refresh: {}", last_refresh.to_rfc3339()),
                ui::StyleType::Subtle
            )
        );
    }
    Ok(summary)
}

/// Refreshes at a fixed interval until interrupted or `cycles` have run.
/// Each cycle completes before the next tick is awaited.
pub async fn schedule(ctx: &AppContext, interval: Duration, cycles: Option<u64>) -> Result<()> {
    let updater = ctx.updater()?;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(interval_secs = interval.as_secs(), "Scheduler started");

    let mut completed = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Scheduler interrupted");
                break;
            }
        }

        match updater.run_update().await {
            Ok(summary) => println!(
                "[{}] {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S"),
                render_summary(&summary)
            ),
            Err(e) => error!(error = %e, "Scheduled update failed"),
        }

        completed += 1;
        if cycles.is_some_and(|n| completed >= n) {
            break;
        }
    }
    info!(completed, "Scheduler stopped");
    Ok(())
}

/// Builds the cached rates table, optionally limited to pairs involving `currency`.
pub fn rates_table(
    doc: &RateCacheDocument,
    currency: Option<&str>,
    now: DateTime<Utc>,
    ttl_seconds: u64,
) -> Option<Table> {
    let rows: Vec<_> = doc
        .pairs
        .iter()
        .filter(|(key, _)| {
            currency.is_none_or(|code| key.split('_').any(|part| part == code))
        })
        .collect();
    if rows.is_empty() {
        return None;
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Pair"),
        ui::header_cell("Rate"),
        ui::header_cell("Source"),
        ui::header_cell("Updated"),
        ui::header_cell("Age"),
        ui::header_cell("Status"),
    ]);

    for (key, entry) in rows {
        let age = now.signed_duration_since(entry.updated_at).num_seconds();
        table.add_row(vec![
            Cell::new(key),
            ui::number_cell(format!("{:.8}", entry.rate)),
            Cell::new(&entry.source),
            Cell::new(entry.updated_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            ui::number_cell(ui::format_age(age)),
            ui::freshness_cell(is_fresh(entry.updated_at, now, ttl_seconds)),
        ]);
    }
    Some(table)
}

pub fn show(ctx: &AppContext, currency: Option<&str>) -> Result<()> {
    let currency = currency.map(get_currency).transpose()?;
    if let Some(currency) = &currency {
        println!("{}\n", currency.display_info());
    }
    let filter = currency.as_ref().map(|c| c.code());
    let doc = ctx.rate_cache().load()?;

    match rates_table(&doc, filter, Utc::now(), ctx.config.rates_ttl_seconds) {
        Some(table) => {
            println!("{}\n", ui::style_text("Cached rates", ui::StyleType::Title));
            println!("{table}");
            if let Some(last_refresh) = doc.last_refresh {
                println!(
                    "\nLast refresh: {} ({})",
                    ui::style_text(&last_refresh.to_rfc3339(), ui::StyleType::TotalLabel),
                    doc.source.as_deref().unwrap_or("unknown")
                );
            }
        }
        None => println!(
            "{}",
            ui::style_text(
                "No cached rates. Run `update-rates` to fetch them.",
                ui::StyleType::Subtle
            )
        ),
    }
    Ok(())
}

pub fn get_rate(ctx: &AppContext, from: &str, to: &str) -> Result<()> {
    let resolver = ctx.resolver();
    let resolved = match resolver.resolve_detailed(from, to, Utc::now()) {
        Ok(resolved) => resolved,
        Err(e) => {
            let hint = match &e {
                RateError::StaleRate { .. } => Some(
                    "Run `update-rates` to refresh the cache and try again.".to_string(),
                ),
                RateError::CurrencyNotFound(_) => Some(format!(
                    "Supported codes: {}",
                    ctx.config.supported_currencies.join(", ")
                )),
                _ => None,
            };
            if let Some(hint) = hint {
                eprintln!("{}", ui::style_text(&hint, ui::StyleType::Subtle));
            }
            return Err(e.into());
        }
    };

    let updated = resolved
        .updated_at
        .map_or("n/a".to_string(), |t| t.to_rfc3339());
    println!(
        "Rate {}→{}: {} (updated: {}, source: {})",
        resolved.pair.from,
        resolved.pair.to,
        ui::style_text(&format!("{:.8}", resolved.rate), ui::StyleType::TotalValue),
        updated,
        resolved.source
    );

    let reverse_pair = resolved.pair.reversed();
    match cached_rate(
        &ctx.rate_cache(),
        &reverse_pair,
        Utc::now(),
        ctx.config.rates_ttl_seconds,
    )? {
        Some(reverse) => println!(
            "Reverse rate {}→{}: {:.8}",
            reverse_pair.from, reverse_pair.to, reverse
        ),
        None => info!(pair = %reverse_pair, "Reverse rate not cached"),
    }
    Ok(())
}

/// Reads a fresh cached rate without seeding or refreshing anything.
fn cached_rate(
    cache: &RateCacheStore,
    pair: &RatePair,
    now: DateTime<Utc>,
    ttl_seconds: u64,
) -> Result<Option<f64>> {
    if pair.from == pair.to {
        return Ok(Some(1.0));
    }
    Ok(cache
        .get(pair)?
        .filter(|entry| is_valid_rate(entry.rate) && is_fresh(entry.updated_at, now, ttl_seconds))
        .map(|entry| entry.rate))
}
