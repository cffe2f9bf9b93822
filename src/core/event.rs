//! The per-emit log event handed to encoders

use super::field::Field;
use super::log_level::LogLevel;
use chrono::{DateTime, Local};
use std::fmt;
use std::panic::Location;

/// Source location of an emit call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryCaller {
    pub file: &'static str,
    pub line: u32,
    /// Module path of the call site, when the macros supplied one
    pub function: Option<&'static str>,
}

impl EntryCaller {
    pub fn new(file: &'static str, line: u32) -> Self {
        Self {
            file,
            line,
            function: None,
        }
    }

    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line())
    }

    #[must_use]
    pub fn with_function(mut self, function: &'static str) -> Self {
        self.function = Some(function);
        self
    }

    /// `file:line` with the path cut after the last separator
    pub fn trimmed_path(&self) -> String {
        let file = self
            .file
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(self.file);
        format!("{}:{}", file, self.line)
    }

    /// `path/to/file.rs:line` as reported by the compiler
    pub fn full_path(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

impl fmt::Display for EntryCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One log call, built by the logger and consumed synchronously by the encoder.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub level: LogLevel,
    pub time: DateTime<Local>,
    pub logger_name: Option<String>,
    pub message: String,
    pub fields: Vec<Field>,
    pub caller: Option<EntryCaller>,
    pub stack: Option<String>,
    /// Correlation id bound explicitly to the logger. When unset, encoders
    /// fall back to their ambient fetcher.
    pub correlation_id: Option<String>,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            time: Local::now(),
            logger_name: None,
            message: message.into(),
            fields: Vec::new(),
            caller: None,
            stack: None,
            correlation_id: None,
        }
    }

    #[must_use]
    pub fn with_time(mut self, time: DateTime<Local>) -> Self {
        self.time = time;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.logger_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn with_caller(mut self, caller: EntryCaller) -> Self {
        self.caller = Some(caller);
        self
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}
