//! Logging macros for ergonomic log message formatting.
//!
//! The macros check the level gate before the format arguments are
//! evaluated, so a disabled call costs one atomic load. They also fill the
//! function column with the calling module path.
//!
//! # Examples
//!
//! ```
//! use rust_field_logger::prelude::*;
//! use rust_field_logger::info;
//!
//! let logger = Logger::builder().sink(MemorySink::new()).build().unwrap();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! ```

/// Log at a runtime level with automatic formatting.
///
/// # Examples
///
/// ```
/// # use rust_field_logger::prelude::*;
/// # let logger = Logger::builder().sink(MemorySink::new()).build().unwrap();
/// use rust_field_logger::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level: $crate::LogLevel = $level;
        if logger.enabled(level) {
            logger.log_args(level, ::std::format_args!($($arg)+), ::std::module_path!());
        }
    }};
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use rust_field_logger::prelude::*;
/// # let logger = Logger::builder().level(LogLevel::Debug).sink(MemorySink::new()).build().unwrap();
/// use rust_field_logger::debug;
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use rust_field_logger::prelude::*;
/// # let logger = Logger::builder().sink(MemorySink::new()).build().unwrap();
/// use rust_field_logger::error;
/// let err = "connection refused";
/// error!(logger, "Failed to connect: {}", err);
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message, then run the logger's fatal hook.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}

/// Log a panic-level message, then unwind.
///
/// ```should_panic
/// # use rust_field_logger::prelude::*;
/// # let logger = Logger::builder().sink(MemorySink::new()).build().unwrap();
/// use rust_field_logger::panic_log;
/// panic_log!(logger, "invariant broken: {}", 7);
/// ```
#[macro_export]
macro_rules! panic_log {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Panic, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::Logger;
    use crate::sinks::MemorySink;
    use crate::LogLevel;
    use std::cell::Cell;
    use std::fmt;

    struct Counted<'a>(&'a Cell<u32>);

    impl fmt::Display for Counted<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            self.0.set(self.0.get() + 1);
            f.write_str("counted")
        }
    }

    fn logger(sink: &MemorySink) -> Logger {
        Logger::builder()
            .level(LogLevel::Info)
            .enable_caller(false)
            .without_ambient_correlation()
            .sink(sink.clone())
            .build()
            .unwrap()
    }

    #[test]
    fn test_macros_format() {
        let sink = MemorySink::new();
        let logger = logger(&sink);
        info!(logger, "port {}", 8080);
        warn!(logger, "{} of {}", 1, 2);
        error!(logger, "plain");
        let lines = sink.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("[INFO] "));
        assert!(lines[0].ends_with(" port 8080"));
        assert!(lines[1].ends_with(" 1 of 2"));
        assert!(lines[2].starts_with("[ERRO] "));
    }

    #[test]
    fn test_disabled_level_skips_formatting() {
        let sink = MemorySink::new();
        let logger = logger(&sink);
        let calls = Cell::new(0);
        debug!(logger, "{}", Counted(&calls));
        assert_eq!(calls.get(), 0);
        assert!(sink.is_empty());

        info!(logger, "{}", Counted(&calls));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_runtime_level() {
        let sink = MemorySink::new();
        let logger = logger(&sink);
        let level = LogLevel::Warn;
        log!(logger, level, "dynamic {}", "level");
        assert!(sink.contents().starts_with("[WARN] "));
    }

    #[test]
    #[should_panic(expected = "boom 3")]
    fn test_panic_log_unwinds() {
        let sink = MemorySink::new();
        let logger = logger(&sink);
        panic_log!(logger, "boom {}", 3);
    }
}
