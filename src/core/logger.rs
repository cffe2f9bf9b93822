//! Main logger implementation

use super::{
    correlation::{self, RequestContext},
    encoder::{ContextFetcher, Encoder},
    encoder_config::EncoderConfig,
    error::{LoggerError, Result},
    event::{EntryCaller, LogEvent},
    field::{Field, FieldValue},
    log_level::{AtomicLevel, LogLevel},
    metrics::LoggerMetrics,
    registry::{global_registry, EncoderRegistry},
    sink::{Sink, SinkSet},
};
use crate::encoders::PlainEncoder;
use crate::sinks::ConsoleSink;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::backtrace::Backtrace;
use std::fmt::{self, Display, Write as _};
use std::panic::Location;
use std::sync::Arc;

/// What a `Fatal` event does after it has been written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FatalHook {
    /// Flush the sinks and exit the process with status 1
    #[default]
    Exit,
    /// Unwind with the message as panic payload
    Panic,
}

struct LoggerCore {
    sinks: SinkSet,
    metrics: LoggerMetrics,
    stacktrace_level: Option<LogLevel>,
    fatal_hook: FatalHook,
    add_caller: bool,
}

impl Drop for LoggerCore {
    fn drop(&mut self) {
        if let Err(e) = self.sinks.flush_all() {
            eprintln!("[LOGGER ERROR] Failed to flush during shutdown: {}", e);
        }

        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger shutting down with {} dropped lines (drop rate: {:.2}%)",
                dropped,
                self.metrics.drop_rate()
            );
        }
    }
}

/// Leveled, field-carrying logger.
///
/// Cloning is cheap. Attaching fields returns a new logger over a clone of
/// the encoder prototype and never touches the receiver. All loggers derived
/// from one root share its level, sinks and metrics.
///
/// # Example
/// ```
/// use rust_field_logger::prelude::*;
///
/// let sink = MemorySink::new();
/// let logger = Logger::builder()
///     .level(LogLevel::Debug)
///     .enable_caller(false)
///     .sink(sink.clone())
///     .build()
///     .unwrap();
///
/// logger.with_field("user", 42).info("user loaded");
/// assert!(sink.contents().contains("[user:42] user loaded"));
/// ```
#[derive(Clone)]
pub struct Logger {
    level: AtomicLevel,
    core: Arc<LoggerCore>,
    encoder: Arc<dyn Encoder>,
    name: Option<Arc<str>>,
    correlation_id: Option<Arc<str>>,
}

impl Logger {
    /// Plain format on stdout at `Info`, with the caller column
    #[must_use]
    pub fn new() -> Self {
        LoggerBuilder::new().build_with_encoder(Box::new(PlainEncoder::new(EncoderConfig::plain())))
    }

    /// Create a builder for Logger
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn level(&self) -> LogLevel {
        self.level.level()
    }

    /// The gate shared by every logger derived from the same root
    pub fn atomic_level(&self) -> &AtomicLevel {
        &self.level
    }

    /// Change the minimum level by name (case-insensitive, empty means
    /// `info`). An unknown name leaves the level unchanged.
    pub fn set_level(&self, name: &str) -> Result<()> {
        self.level.set_level_str(name)
    }

    pub fn set_min_level(&self, level: LogLevel) {
        self.level.set_level(level);
    }

    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.level.enabled(level)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Correlation id bound with [`for_context`](Self::for_context)
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.core.metrics
    }

    pub fn sink_count(&self) -> usize {
        self.core.sinks.len()
    }

    pub fn with_field(&self, key: impl Into<String>, value: impl Into<FieldValue>) -> Logger {
        self.with_fields([Field::new(key, value)])
    }

    /// Logger whose lines carry `fields` after the ones already attached.
    /// An empty set returns a plain clone.
    ///
    /// A field that fails to encode is replaced by a `<key>Error` string.
    pub fn with_fields<I, F>(&self, fields: I) -> Logger
    where
        I: IntoIterator<Item = F>,
        F: Into<Field>,
    {
        let mut fields = fields.into_iter().map(Into::into).peekable();
        if fields.peek().is_none() {
            return self.clone();
        }

        let mut encoder = self.encoder.clone_encoder();
        for field in fields {
            if let Err(err) = field.add_to(encoder.as_mut()) {
                encoder.add_str(&format!("{}Error", field.key), &err.to_string());
            }
        }
        Logger {
            encoder: Arc::from(encoder),
            ..self.clone()
        }
    }

    /// Attach an `error` field (and `errorVerbose` when it has a cause chain)
    pub fn with_error(&self, err: &(dyn std::error::Error + 'static)) -> Logger {
        self.with_fields([Field::error(err)])
    }

    /// Child logger; names join with `.`
    pub fn named(&self, name: &str) -> Logger {
        if name.is_empty() {
            return self.clone();
        }
        let joined = match &self.name {
            Some(parent) => format!("{}.{}", parent, name),
            None => name.to_string(),
        };
        Logger {
            name: Some(Arc::from(joined)),
            ..self.clone()
        }
    }

    /// Logger whose lines carry the context's correlation id regardless of
    /// the ambient store. A context without an id keeps the current binding.
    pub fn for_context(&self, ctx: &RequestContext) -> Logger {
        let correlation_id = ctx
            .correlation_id()
            .map(Arc::from)
            .or_else(|| self.correlation_id.clone());
        Logger {
            correlation_id,
            ..self.clone()
        }
    }

    #[track_caller]
    pub fn debug(&self, message: impl Display) {
        self.emit(LogLevel::Debug, &message, Vec::new(), None);
    }

    #[track_caller]
    pub fn info(&self, message: impl Display) {
        self.emit(LogLevel::Info, &message, Vec::new(), None);
    }

    #[track_caller]
    pub fn warn(&self, message: impl Display) {
        self.emit(LogLevel::Warn, &message, Vec::new(), None);
    }

    #[track_caller]
    pub fn error(&self, message: impl Display) {
        self.emit(LogLevel::Error, &message, Vec::new(), None);
    }

    /// Write, then run the [`FatalHook`]
    #[track_caller]
    pub fn fatal(&self, message: impl Display) {
        self.emit(LogLevel::Fatal, &message, Vec::new(), None);
    }

    /// Write, then panic with the message
    #[track_caller]
    pub fn panic(&self, message: impl Display) {
        self.emit(LogLevel::Panic, &message, Vec::new(), None);
    }

    #[track_caller]
    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Debug, &args, Vec::new(), None);
    }

    #[track_caller]
    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Info, &args, Vec::new(), None);
    }

    #[track_caller]
    pub fn warnf(&self, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Warn, &args, Vec::new(), None);
    }

    #[track_caller]
    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Error, &args, Vec::new(), None);
    }

    #[track_caller]
    pub fn fatalf(&self, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Fatal, &args, Vec::new(), None);
    }

    #[track_caller]
    pub fn panicf(&self, args: fmt::Arguments<'_>) {
        self.emit(LogLevel::Panic, &args, Vec::new(), None);
    }

    /// Log with a runtime template.
    ///
    /// No args: the template is used verbatim. Empty template: the args are
    /// concatenated. Otherwise each `{}` takes the next arg (`{{`/`}}` for
    /// literal braces); unused args are appended after a space.
    #[track_caller]
    pub fn log(&self, level: LogLevel, template: &str, args: &[&dyn Display]) {
        if !self.enabled(level) {
            return;
        }
        let message = render_template(template, args);
        self.emit(level, &message, Vec::new(), None);
    }

    /// Like [`log`](Self::log) but returns encode and sink failures.
    #[track_caller]
    pub fn try_log(&self, level: LogLevel, template: &str, args: &[&dyn Display]) -> Result<()> {
        if !self.enabled(level) {
            return Ok(());
        }
        let message = render_template(template, args);
        self.try_emit(level, &message, Vec::new(), None)
    }

    /// Log with fields that apply to this line only
    #[track_caller]
    pub fn log_fields<I>(&self, level: LogLevel, message: impl Display, fields: I)
    where
        I: IntoIterator<Item = Field>,
    {
        if !self.enabled(level) {
            return;
        }
        self.emit(level, &message, fields.into_iter().collect(), None);
    }

    #[track_caller]
    pub fn try_log_fields<I>(&self, level: LogLevel, message: impl Display, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = Field>,
    {
        if !self.enabled(level) {
            return Ok(());
        }
        self.try_emit(level, &message, fields.into_iter().collect(), None)
    }

    /// Entry point of the logging macros
    #[doc(hidden)]
    #[track_caller]
    pub fn log_args(&self, level: LogLevel, args: fmt::Arguments<'_>, function: &'static str) {
        self.emit(level, &args, Vec::new(), Some(function));
    }

    /// Flush all sinks
    pub fn flush(&self) -> Result<()> {
        self.core.sinks.flush_all()
    }

    #[track_caller]
    fn emit(
        &self,
        level: LogLevel,
        message: &dyn Display,
        fields: Vec<Field>,
        function: Option<&'static str>,
    ) {
        if !self.enabled(level) {
            return;
        }
        let event = self.build_event(level, message, fields, function);
        if let Err(err) = self.write_event(&event) {
            eprintln!("[LOGGER ERROR] Failed to log {} event: {}", level, err);
        }
        self.terminate(&event);
    }

    #[track_caller]
    fn try_emit(
        &self,
        level: LogLevel,
        message: &dyn Display,
        fields: Vec<Field>,
        function: Option<&'static str>,
    ) -> Result<()> {
        let event = self.build_event(level, message, fields, function);
        let result = self.write_event(&event);
        self.terminate(&event);
        result
    }

    #[track_caller]
    fn build_event(
        &self,
        level: LogLevel,
        message: &dyn Display,
        fields: Vec<Field>,
        function: Option<&'static str>,
    ) -> LogEvent {
        let mut event = LogEvent::new(level, message.to_string()).with_fields(fields);
        event.logger_name = self.name.as_deref().map(str::to_owned);
        event.correlation_id = self.correlation_id.as_deref().map(str::to_owned);
        if self.core.add_caller {
            let mut caller = EntryCaller::from_location(Location::caller());
            caller.function = function;
            event.caller = Some(caller);
        }
        if self.core.stacktrace_level.is_some_and(|min| level >= min) {
            event.stack = Some(Backtrace::force_capture().to_string());
        }
        event
    }

    fn write_event(&self, event: &LogEvent) -> Result<()> {
        let metrics = &self.core.metrics;
        let line = match self.encoder.encode_entry(event) {
            Ok(line) => line,
            Err(err) => {
                metrics.record_encode_failure();
                return Err(err);
            }
        };
        match self.core.sinks.write_all(line.as_bytes(), event.level.needs_sync()) {
            Ok(()) => {
                metrics.record_logged();
                Ok(())
            }
            Err(err) => {
                metrics.record_dropped();
                let failed = match &err {
                    LoggerError::SinkWriteFailures { failures } => failures.len(),
                    _ => 1,
                };
                metrics.record_sink_failures(failed as u64);
                Err(err)
            }
        }
    }

    fn terminate(&self, event: &LogEvent) {
        match (event.level, self.core.fatal_hook) {
            (LogLevel::Fatal, FatalHook::Exit) => {
                let _ = self.flush();
                std::process::exit(1);
            }
            (LogLevel::Fatal, FatalHook::Panic) | (LogLevel::Panic, _) => {
                std::panic::panic_any(event.message.clone());
            }
            _ => {}
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("name", &self.name)
            .field("correlation_id", &self.correlation_id)
            .field("sinks", &self.sink_count())
            .finish()
    }
}

fn render_template(template: &str, args: &[&dyn Display]) -> String {
    if args.is_empty() {
        return template.to_string();
    }
    let mut out = String::with_capacity(template.len() + 16 * args.len());
    if template.is_empty() {
        for arg in args {
            let _ = write!(out, "{}", arg);
        }
        return out;
    }

    let mut args = args.iter();
    let mut rest = template;
    while let Some(pos) = rest.find(|c: char| c == '{' || c == '}') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with("{}") {
            match args.next() {
                Some(arg) => {
                    let _ = write!(out, "{}", arg);
                }
                None => out.push_str("{}"),
            }
            rest = &tail[2..];
        } else {
            out.push_str(&tail[..1]);
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    for extra in args {
        let _ = write!(out, " {}", extra);
    }
    out
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use rust_field_logger::prelude::*;
///
/// let logger = Logger::builder()
///     .formatter("json")
///     .level(LogLevel::Debug)
///     .sink(ConsoleSink::stderr())
///     .name("api")
///     .build()
///     .unwrap();
/// assert_eq!(logger.name(), Some("api"));
/// ```
pub struct LoggerBuilder {
    formatter: String,
    encoder_config: Option<EncoderConfig>,
    registry: Option<Arc<EncoderRegistry>>,
    level: LogLevel,
    enable_caller: bool,
    sinks: Vec<Box<dyn Sink>>,
    name: Option<String>,
    stacktrace_level: Option<LogLevel>,
    fatal_hook: FatalHook,
    context_fetcher: Option<ContextFetcher>,
    ambient_correlation: bool,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            formatter: String::new(),
            encoder_config: None,
            registry: None,
            level: LogLevel::Info,
            enable_caller: true,
            sinks: Vec::new(),
            name: None,
            stacktrace_level: None,
            fatal_hook: FatalHook::Exit,
            context_fetcher: None,
            ambient_correlation: true,
        }
    }

    /// Registry name of the output format; empty selects the registry default
    #[must_use = "builder methods return a new value"]
    pub fn formatter(mut self, name: impl Into<String>) -> Self {
        self.formatter = name.into();
        self
    }

    /// Replace the format's default configuration
    #[must_use = "builder methods return a new value"]
    pub fn encoder_config(mut self, config: EncoderConfig) -> Self {
        self.encoder_config = Some(config);
        self
    }

    /// Resolve the formatter here instead of in the global registry
    #[must_use = "builder methods return a new value"]
    pub fn registry(mut self, registry: Arc<EncoderRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Capture the call site of every emit (`file:line` column)
    #[must_use = "builder methods return a new value"]
    pub fn enable_caller(mut self, enable: bool) -> Self {
        self.enable_caller = enable;
        self
    }

    /// Add a sink. Without any, lines go to stdout.
    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sinks(mut self, sinks: Vec<Box<dyn Sink>>) -> Self {
        self.sinks.extend(sinks);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Capture a backtrace for events at or above `level`
    #[must_use = "builder methods return a new value"]
    pub fn add_stacktrace(mut self, level: LogLevel) -> Self {
        self.stacktrace_level = Some(level);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn fatal_hook(mut self, hook: FatalHook) -> Self {
        self.fatal_hook = hook;
        self
    }

    /// Source of the correlation column instead of the ambient store
    #[must_use = "builder methods return a new value"]
    pub fn context_fetcher(mut self, fetcher: ContextFetcher) -> Self {
        self.context_fetcher = Some(fetcher);
        self
    }

    /// Do not read the ambient store; only ids bound with
    /// [`Logger::for_context`] are written.
    #[must_use = "builder methods return a new value"]
    pub fn without_ambient_correlation(mut self) -> Self {
        self.ambient_correlation = false;
        self
    }

    /// Build through the configured registry, or the global one
    pub fn build(self) -> Result<Logger> {
        match self.registry.clone() {
            Some(registry) => self.build_with(&registry),
            None => self.build_with(global_registry()),
        }
    }

    /// # Errors
    ///
    /// `DriverNotFound` for an unknown formatter, `InvalidConfiguration` for
    /// a custom time layout chrono cannot render
    pub fn build_with(mut self, registry: &EncoderRegistry) -> Result<Logger> {
        let factory = registry.resolve(&self.formatter)?;
        let config = self
            .encoder_config
            .take()
            .unwrap_or_else(|| factory.default_config());
        config.encode_time.validate()?;
        Ok(self.build_with_encoder(factory.build(config)))
    }

    /// Build around an encoder prototype constructed by the caller
    pub fn build_with_encoder(self, mut encoder: Box<dyn Encoder>) -> Logger {
        let fetcher = match self.context_fetcher {
            Some(fetcher) => Some(fetcher),
            None if self.ambient_correlation => Some(correlation::ambient_fetcher()),
            None => None,
        };
        if let Some(fetcher) = fetcher {
            encoder.set_context_fetcher(fetcher);
        }

        let mut sinks = self.sinks;
        if sinks.is_empty() {
            sinks.push(Box::new(ConsoleSink::stdout()));
        }

        Logger {
            level: AtomicLevel::new(self.level),
            core: Arc::new(LoggerCore {
                sinks: SinkSet::new(sinks),
                metrics: LoggerMetrics::new(),
                stacktrace_level: self.stacktrace_level,
                fatal_hook: self.fatal_hook,
                add_caller: self.enable_caller,
            }),
            encoder: Arc::from(encoder),
            name: self.name.filter(|n| !n.is_empty()).map(Arc::from),
            correlation_id: None,
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_LOGGER: Lazy<RwLock<Logger>> = Lazy::new(|| {
    RwLock::new(
        LoggerBuilder::new()
            .level(LogLevel::Debug)
            .build_with_encoder(Box::new(PlainEncoder::new(EncoderConfig::plain()))),
    )
});

/// The process-wide logger: plain format on stdout at `Debug` until replaced.
pub fn default_logger() -> Logger {
    DEFAULT_LOGGER.read().clone()
}

/// Replace the process-wide logger.
pub fn set_default_logger(logger: Logger) {
    *DEFAULT_LOGGER.write() = logger;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timestamp::TimestampFormat;
    use crate::sinks::MemorySink;
    use std::cell::Cell;

    fn memory_logger(level: LogLevel) -> (Logger, MemorySink) {
        let sink = MemorySink::new();
        let logger = Logger::builder()
            .level(level)
            .enable_caller(false)
            .encoder_config(EncoderConfig::plain().with_time_key(""))
            .without_ambient_correlation()
            .sink(sink.clone())
            .build()
            .unwrap();
        (logger, sink)
    }

    struct CountingDisplay<'a>(&'a Cell<u32>);

    impl Display for CountingDisplay<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            self.0.set(self.0.get() + 1);
            f.write_str("counted")
        }
    }

    #[test]
    fn test_builder_defaults() {
        let logger = Logger::builder().build().unwrap();
        assert_eq!(logger.level(), LogLevel::Info);
        assert_eq!(logger.sink_count(), 1);
        assert!(logger.name().is_none());
    }

    #[test]
    fn test_builder_unknown_formatter() {
        let err = Logger::builder().formatter("yaml").build().unwrap_err();
        assert!(matches!(err, LoggerError::DriverNotFound { .. }));
    }

    #[test]
    fn test_builder_rejects_invalid_time_layout() {
        let err = Logger::builder()
            .encoder_config(EncoderConfig::plain().with_time_format(TimestampFormat::Custom("%Q".into())))
            .sink(MemorySink::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_invalid_time_layout_never_panics_on_emit() {
        let sink = MemorySink::new();
        let config = EncoderConfig::plain().with_time_format(TimestampFormat::Custom("%Q".into()));
        let logger = Logger::builder()
            .enable_caller(false)
            .without_ambient_correlation()
            .sink(sink.clone())
            .build_with_encoder(Box::new(PlainEncoder::new(config)));
        logger.info("hello");
        let line = &sink.lines()[0];
        assert!(line.starts_with("[INFO] ["), "{line}");
        assert!(line.ends_with("] hello"), "{line}");
    }

    #[test]
    fn test_level_gate_skips_formatting() {
        let (logger, sink) = memory_logger(LogLevel::Warn);
        let calls = Cell::new(0);
        logger.info(CountingDisplay(&calls));
        logger.debug(CountingDisplay(&calls));
        assert_eq!(calls.get(), 0);
        assert!(sink.is_empty());

        logger.warn(CountingDisplay(&calls));
        assert_eq!(calls.get(), 1);
        assert_eq!(sink.lines(), vec!["[WARN] counted"]);
    }

    #[test]
    fn test_set_level_shared_by_children() {
        let (logger, sink) = memory_logger(LogLevel::Info);
        let child = logger.with_field("k", "v");
        assert!(logger.set_level("bogus").is_err());
        assert_eq!(child.level(), LogLevel::Info);

        logger.set_level("ERROR").unwrap();
        child.warn("hidden");
        assert!(sink.is_empty());
        child.error("shown");
        assert_eq!(sink.lines(), vec!["[ERRO] [k:v] shown"]);
    }

    #[test]
    fn test_with_field_does_not_mutate_receiver() {
        let (logger, sink) = memory_logger(LogLevel::Info);
        let child = logger.with_field("a", 1).with_field("b", true);
        logger.info("root");
        child.info("child");
        assert_eq!(sink.lines(), vec!["[INFO] root", "[INFO] [a:1] [b:true] child"]);
    }

    #[test]
    fn test_with_fields_empty_and_map() {
        let (logger, sink) = memory_logger(LogLevel::Info);
        let same = logger.with_fields(Vec::<Field>::new());
        same.info("plain");
        let child = logger.with_fields([("cost", FieldValue::from(100)), ("app", "x".into())]);
        child.info("fields");
        assert_eq!(sink.lines(), vec!["[INFO] plain", "[INFO] [cost:100] [app:x] fields"]);
    }

    #[test]
    fn test_with_fields_records_encode_failure_as_error_key() {
        let (logger, sink) = memory_logger(LogLevel::Info);
        let mut bad = std::collections::BTreeMap::new();
        bad.insert((1, 2), 3);
        logger
            .with_fields([Field::reflected("payload", bad)])
            .info("x");
        let line = &sink.lines()[0];
        assert!(line.starts_with("[INFO] [payloadError:"), "{line}");
    }

    #[test]
    fn test_message_rules() {
        let (logger, sink) = memory_logger(LogLevel::Info);
        logger.log(LogLevel::Info, "verbatim {}", &[]);
        logger.log(LogLevel::Info, "", &[&"a", &1, &"b"]);
        logger.log(LogLevel::Info, "user {} did {}", &[&42, &"login"]);
        logger.log(LogLevel::Info, "{{literal}} {}", &[&1, &2]);
        logger.infof(format_args!("x={}", 5));
        assert_eq!(
            sink.lines(),
            vec![
                "[INFO] verbatim {}",
                "[INFO] a1b",
                "[INFO] user 42 did login",
                "[INFO] {literal} 1 2",
                "[INFO] x=5",
            ]
        );
    }

    #[test]
    fn test_render_template_missing_args() {
        assert_eq!(render_template("{} and {}", &[&"one"]), "one and {}");
        assert_eq!(render_template("brace } alone", &[&1]), "brace } alone 1");
    }

    #[test]
    fn test_try_log_fields_propagates_encode_failure() {
        let (logger, sink) = memory_logger(LogLevel::Info);
        let mut bad = std::collections::BTreeMap::new();
        bad.insert(vec![0u8], 1);
        let err = logger
            .try_log_fields(LogLevel::Info, "x", [Field::reflected("bad", bad)])
            .unwrap_err();
        assert!(matches!(err, LoggerError::EncodeFailure { .. }));
        assert!(sink.is_empty());
        assert_eq!(logger.metrics().encode_failures(), 1);
    }

    #[test]
    fn test_named_joins_segments() {
        let (logger, sink) = memory_logger(LogLevel::Info);
        logger.named("api").named("auth").info("ok");
        assert_eq!(logger.named("").name(), None);
        assert_eq!(sink.lines(), vec!["[INFO] [logger:api.auth] ok"]);
    }

    #[test]
    fn test_for_context_overrides_ambient() {
        let sink = MemorySink::new();
        let logger = Logger::builder()
            .enable_caller(false)
            .encoder_config(EncoderConfig::plain().with_time_key(""))
            .context_fetcher(Arc::new(|| "ambient".to_string()))
            .sink(sink.clone())
            .build()
            .unwrap();
        logger.info("a");
        let ctx = RequestContext::with_correlation_id("req-9");
        let scoped = logger.for_context(&ctx);
        scoped.info("b");
        scoped.for_context(&RequestContext::new()).info("c");
        assert_eq!(
            sink.lines(),
            vec!["[INFO] [ambient] a", "[INFO] [req-9] b", "[INFO] [req-9] c"]
        );
        assert_eq!(scoped.correlation_id(), Some("req-9"));
    }

    #[test]
    fn test_caller_points_at_call_site() {
        let sink = MemorySink::new();
        let logger = Logger::builder()
            .encoder_config(EncoderConfig::plain().with_time_key(""))
            .without_ambient_correlation()
            .sink(sink.clone())
            .build()
            .unwrap();
        let line = line!() + 1;
        logger.info("here");
        assert_eq!(sink.lines(), vec![format!("[INFO] [logger.rs:{}] here", line)]);
    }

    #[test]
    fn test_stacktrace_for_error_tier() {
        let sink = MemorySink::new();
        let logger = Logger::builder()
            .enable_caller(false)
            .add_stacktrace(LogLevel::Error)
            .without_ambient_correlation()
            .sink(sink.clone())
            .build()
            .unwrap();
        logger.warn("no trace");
        logger.error("with trace");
        let lines = sink.lines();
        assert!(!lines[0].contains("[stacktrace:"));
        assert!(lines[1].contains("with trace [stacktrace:"));
    }

    #[test]
    fn test_panic_level_writes_then_unwinds() {
        let (logger, sink) = memory_logger(LogLevel::Info);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            logger.panic("giving up");
        }));
        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<String>().map(String::as_str), Some("giving up"));
        assert_eq!(sink.lines(), vec!["[PANI] giving up"]);
    }

    #[test]
    fn test_fatal_with_panic_hook() {
        let sink = MemorySink::new();
        let logger = Logger::builder()
            .enable_caller(false)
            .encoder_config(EncoderConfig::plain().with_time_key(""))
            .without_ambient_correlation()
            .fatal_hook(FatalHook::Panic)
            .sink(sink.clone())
            .build()
            .unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            logger.fatalf(format_args!("code {}", 7));
        }));
        assert!(result.is_err());
        assert_eq!(sink.lines(), vec!["[FATA] code 7"]);
    }

    #[test]
    fn test_default_logger_replaceable() {
        let (logger, sink) = memory_logger(LogLevel::Info);
        let previous = default_logger();
        assert_eq!(previous.level(), LogLevel::Debug);
        set_default_logger(logger);
        default_logger().info("via default");
        set_default_logger(previous);
        assert_eq!(sink.lines(), vec!["[INFO] via default"]);
    }
}
