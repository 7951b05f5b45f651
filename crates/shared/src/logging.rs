//! Logging setup.
//!
//! Console output goes to stderr so stdout stays clean for results. File
//! output rolls daily and is written from a background worker; keep the
//! returned guard alive until exit or buffered lines are lost.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::LoggingConfig;

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_dir: String,
    /// Log file prefix and the crate whose level `default_level` sets
    pub component: String,
    pub default_level: Level,
    pub console: bool,
    pub file: bool,
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from_settings(
            "anime-search",
            Path::new("data/logs"),
            &LoggingConfig::default(),
        )
    }
}

impl LogConfig {
    /// Build from the `[logging]` config section
    pub fn from_settings(component: &str, log_dir: &Path, settings: &LoggingConfig) -> Self {
        Self {
            log_dir: log_dir.to_string_lossy().into_owned(),
            component: component.to_string(),
            default_level: parse_level(&settings.default_level),
            console: settings.console,
            file: settings.file,
            json_format: settings.json_format,
        }
    }

    /// Filter used when `RUST_LOG` is unset: our crates at the configured
    /// level, HTTP internals at warn
    fn default_directives(&self) -> String {
        let level = self.default_level;
        let mut directives = vec![
            format!("{}={}", self.component.replace('-', "_"), level),
            format!("shared={}", level),
        ];
        directives.extend(["hyper=warn", "reqwest=warn", "h2=warn"].map(String::from));
        directives.join(",")
    }
}

/// Parse a level name, falling back to INFO
pub fn parse_level(level: &str) -> Level {
    level.trim().parse().unwrap_or(Level::INFO)
}

/// Install the global subscriber.
///
/// Returns the file writer's guard when file output is enabled.
pub fn init(config: LogConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directives()));

    let mut layers = Vec::new();

    if config.console {
        layers.push(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .boxed(),
        );
    }

    let mut guard = None;
    if config.file {
        let log_dir = Path::new(&config.log_dir);
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", config.log_dir))?;

        let appender = tracing_appender::rolling::daily(log_dir, &config.component);
        let (writer, worker_guard) = tracing_appender::non_blocking(appender);
        guard = Some(worker_guard);

        let file_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(writer)
                .boxed()
        } else {
            fmt::layer()
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(writer)
                .boxed()
        };
        layers.push(file_layer);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(
        component = %config.component,
        log_dir = %config.log_dir,
        file = config.file,
        "Logging initialized"
    );

    Ok(guard)
}
