//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// No encoder factory is registered under the requested name
    #[error("{name} driver not found")]
    DriverNotFound { name: String },

    /// Level name could not be parsed
    #[error("unrecognized level: {name:?}")]
    InvalidLevel { name: String },

    /// A field value could not be serialized
    #[error("Encode failure: {message}")]
    EncodeFailure { message: String },

    /// A single sink rejected a rendered line
    #[error("Sink '{sink}' write failed: {message}")]
    SinkWriteFailure { sink: String, message: String },

    /// One or more sinks failed during a fan-out write
    #[error("{} sink(s) failed: {}", failures.len(), join_failures(failures))]
    SinkWriteFailures { failures: Vec<LoggerError> },

    /// Named logger instance lookup failed
    #[error("{name} logger not found")]
    LoggerNotFound { name: String },

    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

fn join_failures(failures: &[LoggerError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<serde_json::Error> for LoggerError {
    fn from(err: serde_json::Error) -> Self {
        LoggerError::encode(err.to_string())
    }
}

impl LoggerError {
    pub fn driver_not_found(name: impl Into<String>) -> Self {
        LoggerError::DriverNotFound { name: name.into() }
    }

    pub fn invalid_level(name: impl Into<String>) -> Self {
        LoggerError::InvalidLevel { name: name.into() }
    }

    pub fn encode(message: impl Into<String>) -> Self {
        LoggerError::EncodeFailure {
            message: message.into(),
        }
    }

    pub fn sink_write(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkWriteFailure {
            sink: sink.into(),
            message: message.into(),
        }
    }

    pub fn logger_not_found(name: impl Into<String>) -> Self {
        LoggerError::LoggerNotFound { name: name.into() }
    }

    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::driver_not_found("yaml");
        assert!(matches!(err, LoggerError::DriverNotFound { .. }));

        let err = LoggerError::config("RotatingFileSink", "max_backup must be positive");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerError::sink_write("stdout", "broken pipe");
        assert!(matches!(err, LoggerError::SinkWriteFailure { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::driver_not_found("yaml");
        assert_eq!(err.to_string(), "yaml driver not found");

        let err = LoggerError::invalid_level("loud");
        assert_eq!(err.to_string(), "unrecognized level: \"loud\"");

        let err = LoggerError::file_rotation("/var/log/app.log", "Disk full");
        assert_eq!(
            err.to_string(),
            "File rotation failed for '/var/log/app.log': Disk full"
        );
    }

    #[test]
    fn test_aggregate_sink_failures() {
        let err = LoggerError::SinkWriteFailures {
            failures: vec![
                LoggerError::sink_write("a", "full"),
                LoggerError::sink_write("b", "closed"),
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("2 sink(s) failed"));
        assert!(text.contains("Sink 'a' write failed: full"));
        assert!(text.contains("Sink 'b' write failed: closed"));
    }

    #[test]
    fn test_serde_error_maps_to_encode_failure() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: LoggerError = json_err.into();
        assert!(matches!(err, LoggerError::EncodeFailure { .. }));
    }
}
