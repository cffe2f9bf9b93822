//! Plain line format
//!
//! ```text
//! [INFO] [2024-01-02 15:04:05.000000] [logger:api] [user.rs:42] [req-abc123] [user:42] [cost:100] user loaded
//! ```
//!
//! Enabled columns are wrapped in brackets and separated by single spaces.
//! Fields render as `[key:value]`, the message follows unquoted, and there
//! are no commas anywhere on the line.

use super::escape::{escape_bytes, escape_str};
use crate::core::buffer::{self, Buffer};
use crate::core::encoder::{
    ArrayEncoder, ArrayMarshaler, ContextFetcher, Encoder, ObjectEncoder, ObjectMarshaler,
};
use crate::core::encoder_config::EncoderConfig;
use crate::core::error::Result;
use crate::core::event::LogEvent;
use crate::core::field::{Complex, Reflected};
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;

/// Written in the correlation column when a fetcher is installed but no id is bound
pub const MISSING_CORRELATION_ID: &str = "-";

pub struct PlainEncoder {
    config: Arc<EncoderConfig>,
    buf: Buffer,
    spaced: bool,
    open_namespaces: usize,
    context_fetcher: Option<ContextFetcher>,
}

impl PlainEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        let spaced = config.spaced;
        Self {
            config: Arc::new(config),
            buf: buffer::get(),
            spaced,
            open_namespaces: 0,
            context_fetcher: None,
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Fields accumulated so far, without column or message
    pub fn accumulated(&self) -> &[u8] {
        self.buf.as_bytes()
    }

    fn clone_inner(&self) -> Self {
        let mut buf = buffer::get();
        buf.append_bytes(self.buf.as_bytes());
        Self {
            config: Arc::clone(&self.config),
            buf,
            spaced: self.spaced,
            open_namespaces: self.open_namespaces,
            context_fetcher: self.context_fetcher.clone(),
        }
    }

    /// Same state, empty buffer
    fn fresh(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            buf: buffer::get(),
            spaced: self.spaced,
            open_namespaces: self.open_namespaces,
            context_fetcher: self.context_fetcher.clone(),
        }
    }

    fn add_element_separator(&mut self) {
        if !self.spaced {
            return;
        }
        match self.buf.last_byte() {
            None | Some(b'{' | b'[' | b':' | b',' | b' ') => {}
            Some(_) => self.buf.append_byte(b' '),
        }
    }

    /// Write `b`, preceded by a space when the previous byte closes a column
    fn add_separator(&mut self, b: u8) {
        if self.buf.last_byte() == Some(b']') {
            self.buf.append_byte(b' ');
        }
        self.buf.append_byte(b);
    }

    fn add_key(&mut self, key: &str) {
        escape_str(&mut self.buf, key);
        self.buf.append_byte(b':');
    }

    fn append_float(&mut self, value: f64, bits: u8) {
        self.add_element_separator();
        if value.is_finite() {
            self.buf.append_float(value, bits);
        } else {
            self.buf.append_byte(b'"');
            self.buf.append_float(value, bits);
            self.buf.append_byte(b'"');
        }
    }

    fn close_open_namespaces(&mut self) {
        for _ in 0..self.open_namespaces {
            self.buf.append_byte(b'}');
        }
    }

    /// `[key:` .. `]` around whatever `f` appends
    fn keyed(&mut self, key: &str, f: impl FnOnce(&mut Self)) {
        self.add_separator(b'[');
        self.add_key(key);
        f(self);
        self.add_separator(b']');
    }

    /// Like [`keyed`](Self::keyed); the closing bracket is written even on error
    fn try_keyed(&mut self, key: &str, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        self.add_separator(b'[');
        self.add_key(key);
        let result = f(self);
        self.add_separator(b']');
        result
    }

    /// `[` .. `]` around a column value
    fn column(&mut self, f: impl FnOnce(&mut Self)) {
        self.add_separator(b'[');
        f(self);
        self.add_separator(b']');
    }

    fn correlation_id(&self, event: &LogEvent) -> Option<String> {
        if let Some(id) = &event.correlation_id {
            return Some(id.clone());
        }
        self.context_fetcher.as_ref().map(|fetch| fetch())
    }
}

impl Clone for PlainEncoder {
    fn clone(&self) -> Self {
        self.clone_inner()
    }
}

impl ArrayEncoder for PlainEncoder {
    fn append_bool(&mut self, value: bool) {
        self.add_element_separator();
        self.buf.append_bool(value);
    }

    fn append_i64(&mut self, value: i64) {
        self.add_element_separator();
        self.buf.append_i64(value);
    }

    fn append_u64(&mut self, value: u64) {
        self.add_element_separator();
        self.buf.append_u64(value);
    }

    fn append_f64(&mut self, value: f64) {
        self.append_float(value, 64);
    }

    fn append_f32(&mut self, value: f32) {
        self.append_float(value as f64, 32);
    }

    /// Unquoted, escaped
    fn append_str(&mut self, value: &str) {
        self.add_element_separator();
        escape_str(&mut self.buf, value);
    }

    /// Quoted, escaped
    fn append_byte_str(&mut self, value: &[u8]) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        escape_bytes(&mut self.buf, value);
        self.buf.append_byte(b'"');
    }

    fn append_duration(&mut self, value: Duration) {
        let config = Arc::clone(&self.config);
        config.encode_duration.encode(value, self);
    }

    fn append_time(&mut self, value: &DateTime<Local>) {
        let config = Arc::clone(&self.config);
        config.encode_time.encode(value, self);
    }

    fn append_complex(&mut self, value: Complex) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        self.buf.append_float(value.re, 64);
        if value.im >= 0.0 || value.im.is_nan() {
            self.buf.append_byte(b'+');
        }
        self.buf.append_float(value.im, 64);
        self.buf.append_byte(b'i');
        self.buf.append_byte(b'"');
    }

    fn append_array(&mut self, value: &dyn ArrayMarshaler) -> Result<()> {
        self.add_element_separator();
        self.buf.append_byte(b'[');
        let result = value.marshal_log_array(self);
        self.buf.append_byte(b']');
        result
    }

    fn append_object(&mut self, value: &dyn ObjectMarshaler) -> Result<()> {
        self.add_element_separator();
        self.buf.append_byte(b'{');
        let outer = std::mem::replace(&mut self.open_namespaces, 0);
        let result = value.marshal_log_object(self);
        self.close_open_namespaces();
        self.open_namespaces = outer;
        self.buf.append_byte(b'}');
        result
    }

    fn append_reflected(&mut self, value: &Reflected) -> Result<()> {
        let rendered = value.to_buffer()?;
        self.add_element_separator();
        self.buf.append_bytes(rendered.as_bytes());
        Ok(())
    }
}

impl ObjectEncoder for PlainEncoder {
    fn add_bool(&mut self, key: &str, value: bool) {
        self.keyed(key, |enc| enc.append_bool(value));
    }

    fn add_i64(&mut self, key: &str, value: i64) {
        self.keyed(key, |enc| enc.append_i64(value));
    }

    fn add_u64(&mut self, key: &str, value: u64) {
        self.keyed(key, |enc| enc.append_u64(value));
    }

    fn add_f64(&mut self, key: &str, value: f64) {
        self.keyed(key, |enc| enc.append_f64(value));
    }

    fn add_f32(&mut self, key: &str, value: f32) {
        self.keyed(key, |enc| enc.append_f32(value));
    }

    fn add_str(&mut self, key: &str, value: &str) {
        self.keyed(key, |enc| enc.append_str(value));
    }

    fn add_byte_str(&mut self, key: &str, value: &[u8]) {
        self.keyed(key, |enc| enc.append_byte_str(value));
    }

    fn add_duration(&mut self, key: &str, value: Duration) {
        self.keyed(key, |enc| enc.append_duration(value));
    }

    fn add_time(&mut self, key: &str, value: &DateTime<Local>) {
        self.keyed(key, |enc| enc.append_time(value));
    }

    fn add_complex(&mut self, key: &str, value: Complex) {
        self.keyed(key, |enc| enc.append_complex(value));
    }

    fn add_array(&mut self, key: &str, value: &dyn ArrayMarshaler) -> Result<()> {
        self.try_keyed(key, |enc| enc.append_array(value))
    }

    fn add_object(&mut self, key: &str, value: &dyn ObjectMarshaler) -> Result<()> {
        self.try_keyed(key, |enc| enc.append_object(value))
    }

    fn add_reflected(&mut self, key: &str, value: &Reflected) -> Result<()> {
        // Serialize before touching the buffer so a failure writes nothing
        let rendered = value.to_buffer()?;
        self.keyed(key, |enc| {
            enc.add_element_separator();
            enc.buf.append_bytes(rendered.as_bytes());
        });
        Ok(())
    }

    fn open_namespace(&mut self, key: &str) {
        self.add_element_separator();
        self.add_key(key);
        self.buf.append_byte(b'{');
        self.open_namespaces += 1;
    }
}

impl Encoder for PlainEncoder {
    fn clone_encoder(&self) -> Box<dyn Encoder> {
        Box::new(self.clone_inner())
    }

    fn encode_entry(&self, event: &LogEvent) -> Result<Buffer> {
        let config = Arc::clone(&self.config);
        let mut line = self.fresh();

        if !config.level_key.is_empty() {
            line.column(|enc| config.encode_level.encode(event.level, enc));
        }
        if !config.time_key.is_empty() {
            line.column(|enc| config.encode_time.encode(&event.time, enc));
        }
        if let Some(name) = event.logger_name.as_deref() {
            if !config.name_key.is_empty() && !name.is_empty() {
                line.keyed(&config.name_key, |enc| enc.append_str(name));
            }
        }
        if let Some(caller) = &event.caller {
            if !config.caller_key.is_empty() {
                line.column(|enc| config.encode_caller.encode(caller, enc));
            }
            if let Some(function) = caller.function {
                if !config.function_key.is_empty() {
                    line.keyed(&config.function_key, |enc| enc.append_str(function));
                }
            }
        }
        if !config.correlation_key.is_empty() {
            if let Some(id) = self.correlation_id(event) {
                line.column(|enc| {
                    if id.is_empty() {
                        enc.buf.append_str(MISSING_CORRELATION_ID);
                    } else {
                        escape_str(&mut enc.buf, &id);
                    }
                });
            }
        }

        if !self.buf.is_empty() {
            line.add_element_separator();
            line.buf.append_bytes(self.buf.as_bytes());
        }
        for field in &event.fields {
            field.add_to(&mut line)?;
        }

        if !config.message_key.is_empty() {
            line.append_str(&event.message);
        }
        line.close_open_namespaces();

        if let Some(stack) = event.stack.as_deref() {
            if !config.stacktrace_key.is_empty() {
                line.add_element_separator();
                line.add_str(&config.stacktrace_key, stack);
            }
        }
        line.buf.append_str(config.line_ending());
        Ok(line.buf)
    }

    fn set_context_fetcher(&mut self, fetcher: ContextFetcher) {
        self.context_fetcher = Some(fetcher);
    }
}
