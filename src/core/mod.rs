//! Core logger types and traits

pub mod buffer;
pub mod correlation;
pub mod encoder;
pub mod encoder_config;
pub mod error;
pub mod event;
pub mod field;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod registry;
pub mod sink;
pub mod timestamp;

pub use buffer::{Buffer, BufferPool};
pub use correlation::{
    clear_correlation_id, get_correlation_id, set_correlation_id, CorrelationGuard,
    RequestContext, REQUEST_ID,
};
pub use encoder::{
    ArrayEncoder, ArrayFn, ArrayMarshaler, ContextFetcher, Encoder, ObjectEncoder, ObjectFn,
    ObjectMarshaler,
};
pub use encoder_config::{CallerEncoder, DurationEncoder, EncoderConfig, LevelEncoder};
pub use error::{LoggerError, Result};
pub use event::{EntryCaller, LogEvent};
pub use field::{Complex, ErrorValue, Field, FieldValue, Reflected, ERROR_KEY};
pub use log_level::{AtomicLevel, LogLevel};
pub use logger::{default_logger, set_default_logger, FatalHook, Logger, LoggerBuilder};
pub use metrics::LoggerMetrics;
pub use registry::{
    global_registry, register_encoder, resolve_encoder, EncoderFactory, EncoderRegistry,
    JsonFormat, PlainFormat,
};
pub use sink::Sink;
pub use timestamp::{TimestampFormat, DEFAULT_TIME_LAYOUT};
