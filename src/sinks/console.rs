//! Console sink implementation

use crate::core::{Result, Sink};
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Writes finished lines to the process's stdout or stderr.
///
/// Lines arrive already rendered (colors included when the level encoder
/// asks for them), so the sink only forwards bytes.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    stream: Stream,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self {
            stream: Stream::Stdout,
        }
    }

    pub fn stderr() -> Self {
        Self {
            stream: Stream::Stderr,
        }
    }

    pub fn is_stderr(&self) -> bool {
        self.stream == Stream::Stderr
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Sink for ConsoleSink {
    fn write(&mut self, line: &[u8]) -> Result<()> {
        match self.stream {
            Stream::Stdout => io::stdout().lock().write_all(line)?,
            Stream::Stderr => io::stderr().lock().write_all(line)?,
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match self.stream {
            Stream::Stdout => io::stdout().flush()?,
            Stream::Stderr => io::stderr().flush()?,
        }
        Ok(())
    }

    fn name(&self) -> &str {
        match self.stream {
            Stream::Stdout => "console:stdout",
            Stream::Stderr => "console:stderr",
        }
    }
}
