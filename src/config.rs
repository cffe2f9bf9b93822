//! Declarative logger configuration
//!
//! A [`LogConfig`] describes one logger: its output format, level, caller
//! column and where lines go. [`LogConfigs`] groups named sections, and
//! [`LoggerInstances`] turns them into live loggers.
//!
//! ```
//! use rust_field_logger::config::LogConfig;
//!
//! let config: LogConfig = serde_json::from_str(
//!     r#"{ "formatter": "json", "level": "warn", "stdout": true }"#,
//! ).unwrap();
//! let logger = config.build().unwrap();
//! assert!(!logger.enabled(rust_field_logger::LogLevel::Info));
//! ```

use crate::core::{
    default_logger, global_registry, set_default_logger, EncoderRegistry, LogLevel, Logger,
    LoggerError, Result, Sink,
};
use crate::sinks::{ConsoleSink, RotatingFileSink, RotationPolicy, RotationStrategy};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// A path containing this token rotates hourly by time instead of by size
pub const DATE_PATTERN: &str = "%Y%m%d";

/// Driver used when a section leaves `driver` empty
pub const DEFAULT_DRIVER: &str = "field";

pub const DEFAULT_MAX_FILE_SIZE_MB: i64 = 200;
pub const DEFAULT_MAX_AGE_DAYS: i64 = 15;
pub const DEFAULT_MAX_BACKUP: i64 = 200;

const SECONDS_PER_DAY: u64 = 24 * 3600;

/// One logger section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Logger driver; empty means [`DEFAULT_DRIVER`]
    pub driver: String,
    /// Also write to stdout
    pub stdout: bool,
    /// Encoder name resolved through the registry; empty means `plain`
    pub formatter: String,
    /// Minimum level name; empty means `info`
    pub level: String,
    /// Render the `file:line` caller column
    pub enable_file_line: bool,
    /// Log file path, possibly containing strftime tokens
    pub path: String,
    /// Days to keep size-rotated backups
    pub max_age: i64,
    /// Size limit in megabytes before rotation
    pub max_file_size: i64,
    /// Number of rotated files to keep
    pub max_backup: i64,
    /// Promote this logger to the process-wide default on init
    pub default: bool,
}

/// Named configuration sections, iterated in name order
pub type LogConfigs = BTreeMap<String, LogConfig>;

fn positive_or(value: i64, fallback: i64) -> u64 {
    if value > 0 {
        value as u64
    } else {
        fallback as u64
    }
}

impl LogConfig {
    pub fn max_file_size_mb(&self) -> u64 {
        positive_or(self.max_file_size, DEFAULT_MAX_FILE_SIZE_MB)
    }

    pub fn max_age_days(&self) -> u64 {
        positive_or(self.max_age, DEFAULT_MAX_AGE_DAYS)
    }

    pub fn max_backups(&self) -> usize {
        positive_or(self.max_backup, DEFAULT_MAX_BACKUP) as usize
    }

    /// Whether `path` selects time-based rotation
    pub fn rotates_by_time(&self) -> bool {
        self.path.contains(DATE_PATTERN)
    }

    pub fn min_level(&self) -> Result<LogLevel> {
        self.level.parse()
    }

    /// Construct the configured sinks. With neither a path nor `stdout` the
    /// list is empty and the builder falls back to stdout.
    ///
    /// # Errors
    ///
    /// Returns error if the log file cannot be opened
    pub fn make_sinks(&self) -> Result<Vec<Box<dyn Sink>>> {
        let mut sinks: Vec<Box<dyn Sink>> = Vec::new();
        if !self.path.is_empty() {
            let policy = if self.rotates_by_time() {
                RotationPolicy::new()
                    .with_strategy(RotationStrategy::hourly())
                    .with_max_backups(self.max_backups())
            } else {
                RotationPolicy::new()
                    .with_max_size(self.max_file_size_mb().saturating_mul(1024 * 1024))
                    .with_max_age(Duration::from_secs(
                        self.max_age_days().saturating_mul(SECONDS_PER_DAY),
                    ))
                    .with_max_backups(self.max_backups())
            };
            sinks.push(Box::new(RotatingFileSink::with_policy(&self.path, policy)?));
        }
        if self.stdout {
            sinks.push(Box::new(ConsoleSink::stdout()));
        }
        Ok(sinks)
    }

    /// Build through the global encoder registry
    ///
    /// # Errors
    ///
    /// `DriverNotFound` for an unknown formatter, `InvalidLevel` for an
    /// unparsable level, or an IO error opening the log file
    pub fn build(&self) -> Result<Logger> {
        self.build_with(global_registry())
    }

    /// Build through an explicit encoder registry
    ///
    /// # Errors
    ///
    /// Same as [`LogConfig::build`]
    pub fn build_with(&self, registry: &EncoderRegistry) -> Result<Logger> {
        let level = self.min_level()?;
        Logger::builder()
            .formatter(self.formatter.as_str())
            .level(level)
            .enable_caller(self.enable_file_line)
            .sinks(self.make_sinks()?)
            .build_with(registry)
    }
}

/// Turns a section into a logger
pub type DriverFactory = Arc<dyn Fn(&LogConfig) -> Result<Logger> + Send + Sync>;

static DRIVERS: Lazy<RwLock<HashMap<String, DriverFactory>>> = Lazy::new(|| {
    let mut drivers: HashMap<String, DriverFactory> = HashMap::new();
    drivers.insert(DEFAULT_DRIVER.to_string(), Arc::new(LogConfig::build));
    RwLock::new(drivers)
});

/// Register a logger driver. A later registration under the same name wins.
pub fn register_driver<F>(name: impl Into<String>, factory: F)
where
    F: Fn(&LogConfig) -> Result<Logger> + Send + Sync + 'static,
{
    DRIVERS.write().insert(name.into(), Arc::new(factory));
}

fn resolve_driver(name: &str) -> Result<DriverFactory> {
    let name = if name.is_empty() { DEFAULT_DRIVER } else { name };
    DRIVERS
        .read()
        .get(name)
        .cloned()
        .ok_or_else(|| LoggerError::driver_not_found(name))
}

/// Live loggers built from [`LogConfigs`], retrievable by section name
#[derive(Clone, Default)]
pub struct LoggerInstances {
    instances: BTreeMap<String, Logger>,
}

impl LoggerInstances {
    /// Build every section. A section marked `default` replaces the
    /// process-wide default logger.
    ///
    /// # Errors
    ///
    /// Stops at the first section that fails to build
    pub fn init(configs: &LogConfigs) -> Result<Self> {
        let mut instances = BTreeMap::new();
        for (section, config) in configs {
            let driver = resolve_driver(&config.driver)?;
            let logger = driver(config)?;
            if config.default {
                default_logger().infof(format_args!("log [{}] set as default log", section));
                set_default_logger(logger.clone());
            }
            default_logger().infof(format_args!("log [{}] load success", section));
            instances.insert(section.clone(), logger);
        }
        Ok(Self { instances })
    }

    /// # Errors
    ///
    /// `LoggerNotFound` when no section has that name
    pub fn get(&self, name: &str) -> Result<Logger> {
        self.instances
            .get(name)
            .cloned()
            .ok_or_else(|| LoggerError::logger_not_found(name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.instances.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Re-apply each section's level to its live logger. Every section is
    /// attempted; the first failure is returned.
    ///
    /// # Errors
    ///
    /// `LoggerNotFound` for a section that was never initialised, or
    /// `InvalidLevel` for an unparsable level
    pub fn on_change(&self, configs: &LogConfigs) -> Result<()> {
        let mut first_error = None;
        for (section, config) in configs {
            let result = self
                .get(section)
                .and_then(|logger| logger.set_level(&config.level));
            if let Err(err) = result {
                eprintln!(
                    "[LOGGER WARNING] Reconfigure of log [{}] failed: {}",
                    section, err
                );
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Flush every instance's sinks
    pub fn close(&self) {
        for (section, logger) in &self.instances {
            if let Err(err) = logger.flush() {
                eprintln!("[LOGGER ERROR] Failed to flush log [{}]: {}", section, err);
            }
        }
    }
}

impl std::fmt::Debug for LoggerInstances {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerInstances")
            .field("names", &self.names())
            .finish()
    }
}
