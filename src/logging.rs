use std::env;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogSettings;

const DEFAULT_FILTER: &str = "smartplanner=warn";

/// Installs the global subscriber. Output goes to stderr so `--json` stdout
/// stays parseable.
pub fn init(settings: &LogSettings) {
    let filter = EnvFilter::try_from_env("SMARTPLANNER_LOG").unwrap_or_else(|_| {
        EnvFilter::new(settings.filter.as_deref().unwrap_or(DEFAULT_FILTER))
    });

    let format = env::var("SMARTPLANNER_LOG_FORMAT")
        .ok()
        .or_else(|| settings.format.clone())
        .unwrap_or_else(|| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format.as_str() {
        "json" => registry
            .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
            .try_init(),
        _ => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
