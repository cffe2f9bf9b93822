//! Sink trait for log output destinations

use super::error::{LoggerError, Result};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Receives finished lines. Each call gets exactly one line, terminator included.
pub trait Sink: Send {
    fn write(&mut self, line: &[u8]) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&mut self, line: &[u8]) -> Result<()> {
        (**self).write(line)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Ordered fan-out over every configured sink.
///
/// Each sink sits behind its own lock and runs inside `catch_unwind`, so a
/// failing or panicking sink never keeps the line from the others.
pub(crate) struct SinkSet {
    sinks: Vec<Mutex<Box<dyn Sink>>>,
}

impl SinkSet {
    pub(crate) fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self {
            sinks: sinks.into_iter().map(Mutex::new).collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Write to every sink in order. Failures are collected, not short-circuited.
    pub(crate) fn write_all(&self, line: &[u8], sync: bool) -> Result<()> {
        let mut failures = Vec::new();
        for (idx, sink) in self.sinks.iter().enumerate() {
            let mut sink = sink.lock();
            let result = catch_unwind(AssertUnwindSafe(|| -> Result<()> {
                sink.write(line)?;
                if sync {
                    sink.flush()?;
                }
                Ok(())
            }));
            if let Some(err) = Self::check(idx, sink.name(), "write", result) {
                failures.push(err);
            }
        }
        Self::collect(failures)
    }

    pub(crate) fn flush_all(&self) -> Result<()> {
        let mut failures = Vec::new();
        for (idx, sink) in self.sinks.iter().enumerate() {
            let mut sink = sink.lock();
            let result = catch_unwind(AssertUnwindSafe(|| sink.flush()));
            if let Some(err) = Self::check(idx, sink.name(), "flush", result) {
                failures.push(err);
            }
        }
        Self::collect(failures)
    }

    fn check(
        idx: usize,
        name: &str,
        operation: &str,
        result: std::thread::Result<Result<()>>,
    ) -> Option<LoggerError> {
        match result {
            Ok(Ok(())) => None,
            Ok(Err(err @ LoggerError::SinkWriteFailure { .. })) => Some(err),
            Ok(Err(err)) => Some(LoggerError::sink_write(name, err.to_string())),
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                eprintln!(
                    "[LOGGER CRITICAL] Sink #{} ({}) panicked during {}: {}. \
                     Other sinks continue to function.",
                    idx, name, operation, panic_msg
                );
                Some(LoggerError::sink_write(
                    name,
                    format!("panicked during {}: {}", operation, panic_msg),
                ))
            }
        }
    }

    fn collect(mut failures: Vec<LoggerError>) -> Result<()> {
        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(LoggerError::SinkWriteFailures { failures }),
        }
    }
}
