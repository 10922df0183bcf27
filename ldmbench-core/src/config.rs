//! Process-global configuration and logging setup
//!
//! The library keeps a single read-mostly settings block. Its only
//! behavioral switch is `crash_early`: when set, env/model compatibility
//! mismatches raise instead of being downgraded to empty results.

use std::sync::RwLock;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Logging verbosity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// Everything, including per-iteration optimizer output
    All,
    /// Debug-level diagnostics
    Verbose,
    /// Progress and warnings only
    Info,
    /// Silence
    NoLogging,
}

impl LogLevel {
    /// The `tracing` filter directive corresponding to this level
    #[must_use]
    pub fn filter(&self) -> &'static str {
        match self {
            Self::All => "trace",
            Self::Verbose => "debug",
            Self::Info => "info",
            Self::NoLogging => "off",
        }
    }
}

/// Process-wide settings
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    /// Raise on env/model mismatches instead of returning empty results
    pub crash_early: bool,
    /// Current log level
    pub log_level: LogLevel,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            crash_early: false,
            log_level: LogLevel::Info,
        }
    }
}

lazy_static! {
    static ref CONFIG: RwLock<GlobalConfig> = RwLock::new(GlobalConfig::default());
}

/// Whether capability/space mismatches should raise immediately
#[must_use]
pub fn crash_early() -> bool {
    CONFIG.read().map(|c| c.crash_early).unwrap_or(false)
}

/// Set the `crash_early` flag
pub fn set_crash_early(value: bool) {
    if let Ok(mut cfg) = CONFIG.write() {
        cfg.crash_early = value;
    }
}

/// Current log level
#[must_use]
pub fn log_level() -> LogLevel {
    CONFIG.read().map(|c| c.log_level).unwrap_or(LogLevel::Info)
}

/// Install a global `tracing` subscriber at the given level.
///
/// Safe to call more than once; later calls are ignored by the subscriber
/// registry and only update the stored level.
pub fn init_logging(level: LogLevel) {
    if let Ok(mut cfg) = CONFIG.write() {
        cfg.log_level = level;
    }
    let filter = tracing_subscriber::EnvFilter::new(level.filter());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
