//! Structural configuration shared by encoder instances

use super::encoder::ArrayEncoder;
use super::event::EntryCaller;
use super::log_level::LogLevel;
use super::timestamp::TimestampFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_LINE_ENDING: &str = "\n";

/// How the level column is written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelEncoder {
    /// `INFO`, `WARN`, `ERRO`, `DEBU`
    #[default]
    ShortCapital,
    /// `INFO`, `WARN`, `ERROR`, `DEBUG`
    Capital,
    /// Capital name wrapped in ANSI colors
    CapitalColor,
    /// `info`, `warn`, `error`, `debug`
    Lowercase,
}

impl LevelEncoder {
    pub fn encode(&self, level: LogLevel, enc: &mut dyn ArrayEncoder) {
        match self {
            LevelEncoder::ShortCapital => enc.append_str(level.short_str()),
            LevelEncoder::Capital => enc.append_str(level.to_str()),
            LevelEncoder::Lowercase => enc.append_str(level.as_lower_str()),
            LevelEncoder::CapitalColor => enc.append_str(&colorize(level)),
        }
    }
}

#[cfg(feature = "console")]
fn colorize(level: LogLevel) -> String {
    use colored::Colorize;
    level.to_str().color(level.color_code()).to_string()
}

#[cfg(not(feature = "console"))]
fn colorize(level: LogLevel) -> String {
    level.to_str().to_string()
}

/// How durations are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationEncoder {
    /// Floating-point seconds
    #[default]
    Seconds,
    Millis,
    Nanos,
    /// Human readable, as `Debug` prints it (`1.5s`, `250ms`)
    String,
}

impl DurationEncoder {
    pub fn encode(&self, value: Duration, enc: &mut dyn ArrayEncoder) {
        match self {
            DurationEncoder::Seconds => enc.append_f64(value.as_secs_f64()),
            DurationEncoder::Millis => enc.append_f64(value.as_secs_f64() * 1000.0),
            DurationEncoder::Nanos => enc.append_i64(i64::try_from(value.as_nanos()).unwrap_or(i64::MAX)),
            DurationEncoder::String => enc.append_str(&format!("{value:?}")),
        }
    }
}

/// How the caller column is written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallerEncoder {
    /// `file.rs:42`
    #[default]
    Short,
    /// `src/path/file.rs:42`
    Full,
}

impl CallerEncoder {
    pub fn encode(&self, caller: &EntryCaller, enc: &mut dyn ArrayEncoder) {
        match self {
            CallerEncoder::Short => enc.append_str(&caller.trimmed_path()),
            CallerEncoder::Full => enc.append_str(&caller.full_path()),
        }
    }
}

/// Keys and renderers of an output format. An empty key omits that column.
///
/// # Examples
///
/// ```
/// use rust_field_logger::core::{EncoderConfig, LevelEncoder};
///
/// let config = EncoderConfig::plain()
///     .with_function_key("func")
///     .with_level_encoder(LevelEncoder::Capital);
/// assert_eq!(config.function_key, "func");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    pub message_key: String,
    pub level_key: String,
    pub time_key: String,
    pub name_key: String,
    pub caller_key: String,
    pub function_key: String,
    pub stacktrace_key: String,
    pub correlation_key: String,
    pub line_ending: String,
    /// Space after element separators (plain) or after `:`/`,` (JSON)
    pub spaced: bool,
    pub encode_level: LevelEncoder,
    pub encode_time: TimestampFormat,
    pub encode_duration: DurationEncoder,
    pub encode_caller: CallerEncoder,
}

impl EncoderConfig {
    /// Space-separated bracketed columns with a short capital level
    pub fn plain() -> Self {
        Self {
            message_key: "msg".to_string(),
            level_key: "level".to_string(),
            time_key: "time".to_string(),
            name_key: "logger".to_string(),
            caller_key: "caller".to_string(),
            function_key: String::new(),
            stacktrace_key: "stacktrace".to_string(),
            correlation_key: "rid".to_string(),
            line_ending: DEFAULT_LINE_ENDING.to_string(),
            spaced: true,
            encode_level: LevelEncoder::ShortCapital,
            encode_time: TimestampFormat::Layout,
            encode_duration: DurationEncoder::Seconds,
            encode_caller: CallerEncoder::Short,
        }
    }

    /// Compact JSON with a lowercase level
    pub fn json() -> Self {
        Self {
            spaced: false,
            encode_level: LevelEncoder::Lowercase,
            ..Self::plain()
        }
    }

    /// Line terminator, falling back to `\n` when unset
    pub fn line_ending(&self) -> &str {
        if self.line_ending.is_empty() {
            DEFAULT_LINE_ENDING
        } else {
            &self.line_ending
        }
    }

    #[must_use]
    pub fn with_message_key(mut self, key: impl Into<String>) -> Self {
        self.message_key = key.into();
        self
    }

    #[must_use]
    pub fn with_level_key(mut self, key: impl Into<String>) -> Self {
        self.level_key = key.into();
        self
    }

    #[must_use]
    pub fn with_time_key(mut self, key: impl Into<String>) -> Self {
        self.time_key = key.into();
        self
    }

    #[must_use]
    pub fn with_name_key(mut self, key: impl Into<String>) -> Self {
        self.name_key = key.into();
        self
    }

    #[must_use]
    pub fn with_caller_key(mut self, key: impl Into<String>) -> Self {
        self.caller_key = key.into();
        self
    }

    #[must_use]
    pub fn with_function_key(mut self, key: impl Into<String>) -> Self {
        self.function_key = key.into();
        self
    }

    #[must_use]
    pub fn with_stacktrace_key(mut self, key: impl Into<String>) -> Self {
        self.stacktrace_key = key.into();
        self
    }

    #[must_use]
    pub fn with_correlation_key(mut self, key: impl Into<String>) -> Self {
        self.correlation_key = key.into();
        self
    }

    #[must_use]
    pub fn with_line_ending(mut self, ending: impl Into<String>) -> Self {
        self.line_ending = ending.into();
        self
    }

    #[must_use]
    pub fn with_spaced(mut self, spaced: bool) -> Self {
        self.spaced = spaced;
        self
    }

    #[must_use]
    pub fn with_level_encoder(mut self, encoder: LevelEncoder) -> Self {
        self.encode_level = encoder;
        self
    }

    #[must_use]
    pub fn with_time_format(mut self, format: TimestampFormat) -> Self {
        self.encode_time = format;
        self
    }

    #[must_use]
    pub fn with_duration_encoder(mut self, encoder: DurationEncoder) -> Self {
        self.encode_duration = encoder;
        self
    }

    #[must_use]
    pub fn with_caller_encoder(mut self, encoder: CallerEncoder) -> Self {
        self.encode_caller = encoder;
        self
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::plain()
    }
}
