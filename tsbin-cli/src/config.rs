//! CLI configuration and logging setup

use clap::ValueEnum;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use tsbin_core::DecodeOptions;

/// Environment variable that overrides `--log-level`
pub const LOG_ENV: &str = "TSBIN_LOG";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Single-line human readable output
    Compact,
    /// Multi-line human readable output
    Pretty,
    /// One JSON object per event
    Json,
}

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Default log filter directive
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// How input files are decoded
    pub decode: DecodeOptions,
    /// Digits after the decimal point in table output
    pub precision: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_format: LogFormat::Compact,
            decode: DecodeOptions::default(),
            precision: 6,
        }
    }
}

/// Install the global tracing subscriber. Logs go to stderr so command
/// output on stdout stays machine readable.
pub fn init_logging(config: &CliConfig) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    match config.log_format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}
