//! # Rust Field Logger
//!
//! Leveled, structured logging with typed fields, a pooled encoder pipeline
//! and per-request correlation ids.
//!
//! ## Features
//!
//! - **Typed fields**: attach scalars, durations, times, errors, nested
//!   objects, arrays and any `serde::Serialize` value
//! - **Two formats**: space-separated plain text and strict JSON, plus a
//!   registry for custom encoders
//! - **Correlation ids**: explicit [`RequestContext`] or an ambient
//!   per-thread / per-task id
//! - **Sinks**: console, file, rotating file, any `io::Write`, in-memory
//!
//! ```
//! use rust_field_logger::prelude::*;
//!
//! let sink = MemorySink::new();
//! let logger = Logger::builder()
//!     .formatter("json")
//!     .enable_caller(false)
//!     .sink(sink.clone())
//!     .build()
//!     .unwrap();
//!
//! let ctx = RequestContext::with_correlation_id("req-7");
//! logger.for_context(&ctx).with_field("user", 42).info("user loaded");
//! assert!(sink.contents().contains(r#""rid":"req-7""#));
//! ```

pub mod config;
pub mod core;
pub mod encoders;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::config::{LogConfig, LogConfigs, LoggerInstances};
    pub use crate::core::{
        default_logger, set_default_logger, EncoderConfig, EncoderRegistry, FatalHook, Field,
        FieldValue, LevelEncoder, LogLevel, Logger, LoggerBuilder, LoggerError, LoggerMetrics,
        RequestContext, Result, Sink, TimestampFormat,
    };
    pub use crate::sinks::{
        ConsoleSink, FileSink, MemorySink, RotatingFileSink, RotationPolicy, RotationStrategy,
        WriterSink,
    };
}

pub use crate::config::{LogConfig, LogConfigs, LoggerInstances};
pub use crate::core::{
    clear_correlation_id, default_logger, get_correlation_id, register_encoder,
    set_correlation_id, set_default_logger, EncoderConfig, EncoderRegistry, FatalHook, Field,
    FieldValue, LogLevel, Logger, LoggerBuilder, LoggerError, LoggerMetrics, RequestContext,
    Result, Sink, TimestampFormat,
};
pub use crate::sinks::{ConsoleSink, FileSink, MemorySink, RotatingFileSink, WriterSink};
