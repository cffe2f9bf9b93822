//! Pooled byte buffers used to render log lines
//!
//! Every emit renders into a [`Buffer`] taken from a [`BufferPool`]. The
//! buffer goes back to its pool when it is dropped, so an early return on an
//! encode error releases it just like a successful write does.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const INITIAL_CAPACITY: usize = 1024;

/// Buffers that grew past this are dropped instead of pooled
const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

const MAX_IDLE_BUFFERS: usize = 1024;

static GLOBAL_POOL: Lazy<BufferPool> = Lazy::new(BufferPool::new);

/// Take a buffer from the process-wide pool.
#[inline]
pub fn get() -> Buffer {
    GLOBAL_POOL.acquire()
}

/// The process-wide pool used by the built-in encoders.
pub fn global_pool() -> &'static BufferPool {
    &GLOBAL_POOL
}

/// Free-list of byte vectors. Clones share the same list.
#[derive(Clone, Default)]
pub struct BufferPool {
    shared: Arc<PoolShared>,
}

#[derive(Default)]
struct PoolShared {
    idle: Mutex<Vec<Vec<u8>>>,
    allocated: AtomicU64,
    reused: AtomicU64,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return an empty buffer. Allocates only when no idle buffer is left.
    pub fn acquire(&self) -> Buffer {
        let idle = self.shared.idle.lock().pop();
        let bytes = match idle {
            Some(bytes) => {
                self.shared.reused.fetch_add(1, Ordering::Relaxed);
                bytes
            }
            None => {
                self.shared.allocated.fetch_add(1, Ordering::Relaxed);
                Vec::with_capacity(INITIAL_CAPACITY)
            }
        };
        Buffer {
            bytes,
            pool: Some(self.clone()),
        }
    }

    /// Clear `buffer` and hand its storage to this pool.
    ///
    /// Dropping a pooled buffer has the same effect on its own pool.
    pub fn release(&self, mut buffer: Buffer) {
        buffer.pool = None;
        self.put(std::mem::take(&mut buffer.bytes));
    }

    fn put(&self, mut bytes: Vec<u8>) {
        if bytes.capacity() == 0 || bytes.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        bytes.clear();
        let mut idle = self.shared.idle.lock();
        if idle.len() < MAX_IDLE_BUFFERS {
            idle.push(bytes);
        }
    }

    /// Number of buffers waiting to be reused
    pub fn idle(&self) -> usize {
        self.shared.idle.lock().len()
    }

    /// Buffers created because the pool was empty
    pub fn allocated(&self) -> u64 {
        self.shared.allocated.load(Ordering::Relaxed)
    }

    /// Buffers handed out from the idle list
    pub fn reused(&self) -> u64 {
        self.shared.reused.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("idle", &self.idle())
            .field("allocated", &self.allocated())
            .field("reused", &self.reused())
            .finish()
    }
}

/// Growable byte buffer with append helpers for the encoders.
///
/// Buffers obtained from a pool return to it on drop; `Buffer::new()` makes
/// an unpooled one.
pub struct Buffer {
    bytes: Vec<u8>,
    pool: Option<BufferPool>,
}

impl Buffer {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            pool: None,
        }
    }

    #[inline]
    pub fn append_byte(&mut self, b: u8) {
        self.bytes.push(b);
    }

    #[inline]
    pub fn append_str(&mut self, s: &str) {
        self.bytes.extend_from_slice(s.as_bytes());
    }

    #[inline]
    pub fn append_bytes(&mut self, b: &[u8]) {
        self.bytes.extend_from_slice(b);
    }

    pub fn append_i64(&mut self, v: i64) {
        let _ = fmt::Write::write_fmt(self, format_args!("{v}"));
    }

    pub fn append_u64(&mut self, v: u64) {
        let _ = fmt::Write::write_fmt(self, format_args!("{v}"));
    }

    pub fn append_bool(&mut self, v: bool) {
        self.append_str(if v { "true" } else { "false" });
    }

    /// Shortest decimal form that round-trips at the given width (32 or 64).
    ///
    /// Never uses exponent notation. Non-finite values come out as `NaN`,
    /// `+Inf` and `-Inf`.
    pub fn append_float(&mut self, v: f64, bits: u8) {
        if v.is_nan() {
            self.append_str("NaN");
        } else if v.is_infinite() {
            self.append_str(if v > 0.0 { "+Inf" } else { "-Inf" });
        } else if bits == 32 {
            let _ = fmt::Write::write_fmt(self, format_args!("{}", v as f32));
        } else {
            let _ = fmt::Write::write_fmt(self, format_args!("{v}"));
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    #[inline]
    pub fn last_byte(&self) -> Option<u8> {
        self.bytes.last().copied()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lossy UTF-8 view, mostly for tests and diagnostics
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Drop one trailing `\n` if present
    pub fn trim_newline(&mut self) {
        if self.bytes.last() == Some(&b'\n') {
            self.bytes.pop();
        }
    }

    pub fn reset(&mut self) {
        self.bytes.clear();
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.put(std::mem::take(&mut self.bytes));
        }
    }
}

impl fmt::Write for Buffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append_str(s);
        Ok(())
    }
}

impl io::Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("bytes", &self.to_string_lossy())
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}
