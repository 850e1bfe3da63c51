use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseSettings,
    pub demo: DemoSettings,
    pub logging: LoggingSettings,
}

/// Where the data store lives and how a session connects to it.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Path of the SQLite file. Created on first connect.
    pub target: String,
    /// How long a connection waits on a locked store before giving up.
    pub busy_timeout_ms: u64,
}

impl DatabaseSettings {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Parameters of the demo subcommands.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoSettings {
    pub fast_latency_ms: u64,
    pub slow_latency_ms: u64,
    pub batch_size: usize,
    pub min_age: i64,
}

impl DemoSettings {
    pub fn fast_latency(&self) -> Duration {
        Duration::from_millis(self.fast_latency_ms)
    }

    pub fn slow_latency(&self) -> Duration {
        Duration::from_millis(self.slow_latency_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// An `EnvFilter` directive such as `info` or `database=debug`. `RUST_LOG` overrides it.
    pub level: String,
    pub format: LogFormat,
    /// When set, a daily-rolling log file is written here as well.
    pub directory: Option<PathBuf>,
}

/// How console log lines are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Full,
    Compact,
}
