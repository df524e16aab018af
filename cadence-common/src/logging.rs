//! Tracing bootstrap shared by binaries and integration tests.

use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    Layer, layer::SubscriberExt, util::SubscriberInitExt,
};

#[derive(Debug, Default)]
pub struct Logger;

impl Logger {
    /// Initialise the global tracing subscriber.
    ///
    /// The level is taken from `LOG_LEVEL` when set, otherwise defaults to
    /// `TRACE` in debug builds and `INFO` in release builds. Calling this
    /// more than once is a no-op (the second registration fails quietly),
    /// which keeps it safe to call from every test binary.
    pub fn init() {
        let level = if let Ok(level) = std::env::var("LOG_LEVEL") {
            match level.to_ascii_lowercase().as_str() {
                "error" => LevelFilter::ERROR,
                "warn" => LevelFilter::WARN,
                "info" => LevelFilter::INFO,
                "debug" => LevelFilter::DEBUG,
                _ => LevelFilter::TRACE,
            }
        } else if cfg!(debug_assertions) {
            LevelFilter::TRACE
        } else {
            LevelFilter::INFO
        };

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_ansi(true)
                    .with_filter(level),
            )
            .try_init();
    }
}
