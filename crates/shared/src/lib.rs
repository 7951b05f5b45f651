//! Configuration and logging for the anime search workspace.

pub mod config;
pub mod logging;

pub use config::Config;
pub use logging::LogConfig;
