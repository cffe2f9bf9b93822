//! Encoder traits
//!
//! An encoder is both an accumulator of key/value fields ([`ObjectEncoder`])
//! and a line renderer ([`Encoder::encode_entry`]). The configured encoder is
//! a prototype: loggers attach fields to clones of it, and every emit renders
//! through a fresh clone, so the prototype is never written on the hot path.

use super::buffer::Buffer;
use super::error::Result;
use super::event::LogEvent;
use super::field::{Complex, Reflected};
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;

/// Returns the ambient correlation id, or an empty string when none is bound.
pub type ContextFetcher = Arc<dyn Fn() -> String + Send + Sync>;

/// Bare values, as written inside arrays or as column contents.
pub trait ArrayEncoder {
    fn append_bool(&mut self, value: bool);
    fn append_i64(&mut self, value: i64);
    fn append_u64(&mut self, value: u64);
    fn append_f64(&mut self, value: f64);
    fn append_f32(&mut self, value: f32);
    fn append_str(&mut self, value: &str);
    fn append_byte_str(&mut self, value: &[u8]);
    fn append_duration(&mut self, value: Duration);
    fn append_time(&mut self, value: &DateTime<Local>);
    fn append_complex(&mut self, value: Complex);
    fn append_array(&mut self, value: &dyn ArrayMarshaler) -> Result<()>;
    fn append_object(&mut self, value: &dyn ObjectMarshaler) -> Result<()>;
    fn append_reflected(&mut self, value: &Reflected) -> Result<()>;
}

/// Keyed values.
pub trait ObjectEncoder {
    fn add_bool(&mut self, key: &str, value: bool);
    fn add_i64(&mut self, key: &str, value: i64);
    fn add_u64(&mut self, key: &str, value: u64);
    fn add_f64(&mut self, key: &str, value: f64);
    fn add_f32(&mut self, key: &str, value: f32);
    fn add_str(&mut self, key: &str, value: &str);
    fn add_byte_str(&mut self, key: &str, value: &[u8]);
    fn add_duration(&mut self, key: &str, value: Duration);
    fn add_time(&mut self, key: &str, value: &DateTime<Local>);
    fn add_complex(&mut self, key: &str, value: Complex);
    fn add_array(&mut self, key: &str, value: &dyn ArrayMarshaler) -> Result<()>;
    fn add_object(&mut self, key: &str, value: &dyn ObjectMarshaler) -> Result<()>;
    fn add_reflected(&mut self, key: &str, value: &Reflected) -> Result<()>;

    /// Every key added after this call nests under `key` until the line ends.
    fn open_namespace(&mut self, key: &str);
}

/// A value that writes itself as a nested object.
pub trait ObjectMarshaler: Send + Sync {
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()>;
}

/// A value that writes itself as a nested array.
pub trait ArrayMarshaler: Send + Sync {
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()>;
}

/// Adapts a closure into an [`ObjectMarshaler`].
pub struct ObjectFn<F>(pub F);

impl<F> ObjectMarshaler for ObjectFn<F>
where
    F: Fn(&mut dyn ObjectEncoder) -> Result<()> + Send + Sync,
{
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
        (self.0)(enc)
    }
}

/// Adapts a closure into an [`ArrayMarshaler`].
pub struct ArrayFn<F>(pub F);

impl<F> ArrayMarshaler for ArrayFn<F>
where
    F: Fn(&mut dyn ArrayEncoder) -> Result<()> + Send + Sync,
{
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        (self.0)(enc)
    }
}

macro_rules! impl_array_marshaler {
    ($($ty:ty => $method:ident),* $(,)?) => {
        $(
            impl ArrayMarshaler for Vec<$ty> {
                fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
                    for value in self {
                        enc.$method(*value);
                    }
                    Ok(())
                }
            }
        )*
    };
}

impl_array_marshaler! {
    bool => append_bool,
    i64 => append_i64,
    u64 => append_u64,
    f64 => append_f64,
    Duration => append_duration,
}

impl ArrayMarshaler for Vec<String> {
    fn marshal_log_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()> {
        for value in self {
            enc.append_str(value);
        }
        Ok(())
    }
}

/// A complete output format.
pub trait Encoder: ObjectEncoder + Send + Sync {
    /// Copy of this encoder with its accumulated fields and a fresh buffer
    fn clone_encoder(&self) -> Box<dyn Encoder>;

    /// Render one event as a finished line, terminator included.
    ///
    /// The returned buffer goes back to the pool when dropped.
    fn encode_entry(&self, event: &LogEvent) -> Result<Buffer>;

    /// Install the ambient correlation-id lookup. Formats without a
    /// correlation column keep the default no-op.
    fn set_context_fetcher(&mut self, _fetcher: ContextFetcher) {}
}
