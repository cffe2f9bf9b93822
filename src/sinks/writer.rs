//! Adapter turning any `io::Write` into a sink

use crate::core::{Result, Sink};
use std::io::Write;

/// Forwards each line to a wrapped writer.
///
/// ```
/// use rust_field_logger::prelude::*;
///
/// let logger = Logger::builder()
///     .sink(WriterSink::new(std::io::sink()))
///     .build()
///     .unwrap();
/// logger.info("discarded");
/// ```
pub struct WriterSink<W: Write + Send> {
    writer: W,
    name: String,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            name: "writer".to_string(),
        }
    }

    /// Name reported in sink failure errors
    #[must_use = "builder methods return a new value"]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn write(&mut self, line: &[u8]) -> Result<()> {
        self.writer.write_all(line)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
