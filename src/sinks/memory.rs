//! In-memory sink for tests

use crate::core::{Result, Sink};
use parking_lot::Mutex;
use std::sync::Arc;

/// Collects every line in a shared buffer. Clones share the same storage,
/// so a test can hand one clone to the logger and inspect the other.
///
/// ```
/// use rust_field_logger::prelude::*;
///
/// let sink = MemorySink::new();
/// let logger = Logger::builder()
///     .sink(sink.clone())
///     .enable_caller(false)
///     .build()
///     .unwrap();
/// logger.warn("low disk");
/// assert!(sink.contents().starts_with("[WARN] "));
/// assert!(sink.contents().ends_with(" low disk\n"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    /// Written lines without their terminators
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.lock().is_empty()
    }

    pub fn clear(&self) {
        self.bytes.lock().clear();
    }
}

impl Sink for MemorySink {
    fn write(&mut self, line: &[u8]) -> Result<()> {
        self.bytes.lock().extend_from_slice(line);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
