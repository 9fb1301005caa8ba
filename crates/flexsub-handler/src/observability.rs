// Tracing initialization; RUST_LOG wins over the configured level.
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::LoggingConfig;

pub fn init_tracing(logging: &LoggingConfig) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(&logging.level));

    // CloudWatch stamps every line itself and renders no colors
    let json_layer = logging
        .json
        .then(|| fmt::layer().json().with_ansi(false).without_time());
    let text_layer = (!logging.json).then(|| fmt::layer().with_ansi(false).without_time());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();
}
