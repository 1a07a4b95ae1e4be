// Define a new module for logging initialization
use super::error::RateError;
use std::fmt::Display;
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

pub fn init_logging(verbose: bool) {
    let (level_filter, level) = if verbose {
        (LevelFilter::DEBUG, "debug")
    } else {
        (LevelFilter::OFF, "off")
    };
    let app_filter = Targets::new().with_target("valutrade", level_filter);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time())
        .with(app_filter)
        .with(env_filter)
        .init();
}

/// Runs a use-case and records its outcome.
///
/// Success is logged with a summary of the result; failure is logged with the
/// error kind and message and then returned unchanged.
pub fn log_action<T, F>(action: &str, user: &str, f: F) -> Result<T, RateError>
where
    T: Display,
    F: FnOnce() -> Result<T, RateError>,
{
    match f() {
        Ok(result) => {
            info!(action, user, result = "OK", details = %result, "Action completed");
            Ok(result)
        }
        Err(e) => {
            error!(
                action,
                user,
                result = "ERROR",
                error_type = e.kind(),
                error_message = %e,
                "Action failed"
            );
            Err(e)
        }
    }
}
