//! Log level definitions and the shared atomic level gate

use super::error::{LoggerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug = 0,
    #[default]
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
    Panic = 5,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
        LogLevel::Panic,
    ];

    pub fn to_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
            LogLevel::Panic => "PANIC",
        }
    }

    /// Lowercase name, as accepted by `FromStr` and used by the JSON format
    pub fn as_lower_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
            LogLevel::Panic => "panic",
        }
    }

    /// First four letters of the capital name (`DEBU`, `INFO`, `ERRO`, ...)
    pub fn short_str(&self) -> &'static str {
        &self.to_str()[..4]
    }

    /// Events above `Error` are flushed to every sink right after writing.
    pub fn needs_sync(&self) -> bool {
        *self > LogLevel::Error
    }

    #[cfg(feature = "console")]
    pub fn color_code(&self) -> colored::Color {
        use colored::Color::*;
        match self {
            LogLevel::Debug => Magenta,
            LogLevel::Info => Blue,
            LogLevel::Warn => Yellow,
            LogLevel::Error => Red,
            LogLevel::Fatal | LogLevel::Panic => BrightRed,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            3 => LogLevel::Error,
            4 => LogLevel::Fatal,
            _ => LogLevel::Panic,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for LogLevel {
    type Err = LoggerError;

    /// Case-insensitive. An empty name means `Info`.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" | "" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" => Ok(LogLevel::Fatal),
            "panic" => Ok(LogLevel::Panic),
            _ => Err(LoggerError::invalid_level(s)),
        }
    }
}

/// Minimum-level gate shared by every logger derived from one root.
///
/// Cloning an `AtomicLevel` shares the underlying value, so a change made
/// through any clone (for example on a reconfigure signal) is seen by all
/// of them on their next emit, without readers taking a lock.
#[derive(Debug, Clone)]
pub struct AtomicLevel {
    inner: Arc<AtomicU8>,
}

impl AtomicLevel {
    pub fn new(level: LogLevel) -> Self {
        Self {
            inner: Arc::new(AtomicU8::new(level as u8)),
        }
    }

    #[inline]
    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.inner.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level as u8 >= self.inner.load(Ordering::Relaxed)
    }

    pub fn set_level(&self, level: LogLevel) {
        self.inner.store(level as u8, Ordering::Relaxed);
    }

    /// Parse and apply a level name; on failure the current level is kept.
    pub fn set_level_str(&self, name: &str) -> Result<()> {
        let level: LogLevel = name.parse()?;
        self.set_level(level);
        Ok(())
    }
}

impl Default for AtomicLevel {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}
