//! JSON line format
//!
//! ```text
//! {"level":"info","time":"2024-01-02 15:04:05.000000","caller":"user.rs:42","rid":"req-abc123","msg":"user loaded","user":42}
//! ```

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

pub struct JsonEncoder {
    config: Arc<EncoderConfig>,
    buf: Buffer,
    spaced: bool,
    open_namespaces: usize,
    context_fetcher: Option<ContextFetcher>,
}

impl JsonEncoder {
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

    /// Comma-separated members accumulated so far, without braces
    pub fn accumulated(&self) -> &[u8] {
        self.buf.as_bytes()
    }

    fn with_buffer(&self, buf: Buffer) -> Self {
        Self {
            config: Arc::clone(&self.config),
            buf,
            spaced: self.spaced,
            open_namespaces: self.open_namespaces,
            context_fetcher: self.context_fetcher.clone(),
        }
    }

    fn add_element_separator(&mut self) {
        match self.buf.last_byte() {
            None | Some(b'{' | b'[' | b':' | b',' | b' ') => {}
            Some(_) => {
                self.buf.append_byte(b',');
                if self.spaced {
                    self.buf.append_byte(b' ');
                }
            }
        }
    }

    fn add_key(&mut self, key: &str) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        escape_str(&mut self.buf, key);
        self.buf.append_byte(b'"');
        self.buf.append_byte(b':');
        if self.spaced {
            self.buf.append_byte(b' ');
        }
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

    fn correlation_id(&self, event: &LogEvent) -> Option<String> {
        if let Some(id) = &event.correlation_id {
            return Some(id.clone());
        }
        self.context_fetcher.as_ref().map(|fetch| fetch())
    }
}

impl Clone for JsonEncoder {
    fn clone(&self) -> Self {
        let mut buf = buffer::get();
        buf.append_bytes(self.buf.as_bytes());
        self.with_buffer(buf)
    }
}

impl ArrayEncoder for JsonEncoder {
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

    fn append_str(&mut self, value: &str) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        escape_str(&mut self.buf, value);
        self.buf.append_byte(b'"');
    }

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
        // Namespaces opened inside the object close with it
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

impl ObjectEncoder for JsonEncoder {
    fn add_bool(&mut self, key: &str, value: bool) {
        self.add_key(key);
        self.append_bool(value);
    }

    fn add_i64(&mut self, key: &str, value: i64) {
        self.add_key(key);
        self.append_i64(value);
    }

    fn add_u64(&mut self, key: &str, value: u64) {
        self.add_key(key);
        self.append_u64(value);
    }

    fn add_f64(&mut self, key: &str, value: f64) {
        self.add_key(key);
        self.append_f64(value);
    }

    fn add_f32(&mut self, key: &str, value: f32) {
        self.add_key(key);
        self.append_f32(value);
    }

    fn add_str(&mut self, key: &str, value: &str) {
        self.add_key(key);
        self.append_str(value);
    }

    fn add_byte_str(&mut self, key: &str, value: &[u8]) {
        self.add_key(key);
        self.append_byte_str(value);
    }

    fn add_duration(&mut self, key: &str, value: Duration) {
        self.add_key(key);
        self.append_duration(value);
    }

    fn add_time(&mut self, key: &str, value: &DateTime<Local>) {
        self.add_key(key);
        self.append_time(value);
    }

    fn add_complex(&mut self, key: &str, value: Complex) {
        self.add_key(key);
        self.append_complex(value);
    }

    fn add_array(&mut self, key: &str, value: &dyn ArrayMarshaler) -> Result<()> {
        self.add_key(key);
        self.append_array(value)
    }

    fn add_object(&mut self, key: &str, value: &dyn ObjectMarshaler) -> Result<()> {
        self.add_key(key);
        self.append_object(value)
    }

    fn add_reflected(&mut self, key: &str, value: &Reflected) -> Result<()> {
        // A failed value must not leave a dangling key behind
        let rendered = value.to_buffer()?;
        self.add_key(key);
        self.buf.append_bytes(rendered.as_bytes());
        Ok(())
    }

    fn open_namespace(&mut self, key: &str) {
        self.add_key(key);
        self.buf.append_byte(b'{');
        self.open_namespaces += 1;
    }
}

impl Encoder for JsonEncoder {
    fn clone_encoder(&self) -> Box<dyn Encoder> {
        Box::new(self.clone())
    }

    fn encode_entry(&self, event: &LogEvent) -> Result<Buffer> {
        let config = Arc::clone(&self.config);
        let mut line = self.with_buffer(buffer::get());
        line.buf.append_byte(b'{');

        if !config.level_key.is_empty() {
            line.add_key(&config.level_key);
            config.encode_level.encode(event.level, &mut line);
        }
        if !config.time_key.is_empty() {
            line.add_key(&config.time_key);
            config.encode_time.encode(&event.time, &mut line);
        }
        if let Some(name) = event.logger_name.as_deref() {
            if !config.name_key.is_empty() && !name.is_empty() {
                line.add_str(&config.name_key, name);
            }
        }
        if let Some(caller) = &event.caller {
            if !config.caller_key.is_empty() {
                line.add_key(&config.caller_key);
                config.encode_caller.encode(caller, &mut line);
            }
            if let Some(function) = caller.function {
                if !config.function_key.is_empty() {
                    line.add_str(&config.function_key, function);
                }
            }
        }
        if !config.correlation_key.is_empty() {
            if let Some(id) = self.correlation_id(event).filter(|id| !id.is_empty()) {
                line.add_str(&config.correlation_key, &id);
            }
        }
        if !config.message_key.is_empty() {
            line.add_str(&config.message_key, &event.message);
        }

        if !self.buf.is_empty() {
            line.add_element_separator();
            line.buf.append_bytes(self.buf.as_bytes());
        }
        for field in &event.fields {
            field.add_to(&mut line)?;
        }
        line.close_open_namespaces();

        if let Some(stack) = event.stack.as_deref() {
            if !config.stacktrace_key.is_empty() {
                line.add_str(&config.stacktrace_key, stack);
            }
        }
        line.buf.append_byte(b'}');
        line.buf.append_str(config.line_ending());
        Ok(line.buf)
    }

    fn set_context_fetcher(&mut self, fetcher: ContextFetcher) {
        self.context_fetcher = Some(fetcher);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::EntryCaller;
    use crate::core::field::Field;
    use crate::core::log_level::LogLevel;
    use crate::core::timestamp::TimestampFormat;
    use serde_json::Value;
    use std::collections::BTreeMap;

    fn parse(buf: &Buffer) -> Value {
        serde_json::from_slice(buf.as_bytes()).expect("valid JSON line")
    }

    #[test]
    fn test_columns_and_fields() {
        let mut encoder = JsonEncoder::new(EncoderConfig::json().with_function_key("func"));
        encoder.set_context_fetcher(Arc::new(|| "req-7".to_string()));
        encoder.add_str("app", "billing");

        let event = LogEvent::new(LogLevel::Warn, "slow query")
            .with_name("db")
            .with_caller(EntryCaller::new("src/db.rs", 12).with_function("app::db"))
            .with_field(Field::int("ms", 950));
        let line = encoder.encode_entry(&event).unwrap();
        assert!(line.as_bytes().ends_with(b"}\n"));

        let value = parse(&line);
        assert_eq!(value["level"], "warn");
        assert_eq!(value["logger"], "db");
        assert_eq!(value["caller"], "db.rs:12");
        assert_eq!(value["func"], "app::db");
        assert_eq!(value["rid"], "req-7");
        assert_eq!(value["msg"], "slow query");
        assert_eq!(value["app"], "billing");
        assert_eq!(value["ms"], 950);
        assert!(value["time"].is_string());
    }

    #[test]
    fn test_disabled_columns_omit_keys() {
        let encoder = JsonEncoder::new(
            EncoderConfig::json()
                .with_time_key("")
                .with_level_key("")
                .with_caller_key(""),
        );
        let event = LogEvent::new(LogLevel::Info, "x").with_caller(EntryCaller::new("a.rs", 1));
        let line = encoder.encode_entry(&event).unwrap();
        assert_eq!(line.to_string_lossy(), "{\"msg\":\"x\"}\n");
    }

    #[test]
    fn test_empty_ambient_id_omitted() {
        let mut encoder = JsonEncoder::new(EncoderConfig::json().with_time_key(""));
        encoder.set_context_fetcher(Arc::new(String::new));
        let line = encoder
            .encode_entry(&LogEvent::new(LogLevel::Info, "x"))
            .unwrap();
        assert_eq!(line.to_string_lossy(), "{\"level\":\"info\",\"msg\":\"x\"}\n");
    }

    #[test]
    fn test_float_tokens_and_complex() {
        let mut encoder = JsonEncoder::new(EncoderConfig::json());
        encoder.add_f64("a", f64::NAN);
        encoder.add_f64("b", f64::NEG_INFINITY);
        encoder.add_f64("c", 2.25);
        encoder.add_complex("z", Complex::new(0.5, 3.0));
        assert_eq!(
            encoder.accumulated(),
            br#""a":"NaN","b":"-Inf","c":2.25,"z":"0.5+3i""#
        );
    }

    #[test]
    fn test_namespaces_nest_and_close() {
        let mut encoder = JsonEncoder::new(EncoderConfig::json().with_time_key(""));
        encoder.open_namespace("http");
        encoder.add_str("method", "GET");
        let event = LogEvent::new(LogLevel::Info, "req")
            .with_field(Field::namespace("resp"))
            .with_field(Field::uint("status", 200u16));
        let value = parse(&encoder.encode_entry(&event).unwrap());
        assert_eq!(value["http"]["method"], "GET");
        assert_eq!(value["http"]["resp"]["status"], 200);
    }

    #[test]
    fn test_nested_object_array_and_reflected() {
        let mut encoder = JsonEncoder::new(EncoderConfig::json());
        encoder
            .add_object(
                "user",
                &vec![Field::int("id", 1), Field::strings("roles", ["a", "b"])],
            )
            .unwrap();
        let mut map = BTreeMap::new();
        map.insert("nested", vec![1, 2]);
        encoder.add_reflected("meta", &Reflected::new(map)).unwrap();
        encoder.add_reflected("none", &Reflected::new(Option::<u8>::None)).unwrap();

        let wrapped = format!("{{{}}}", String::from_utf8_lossy(encoder.accumulated()));
        let value: Value = serde_json::from_str(&wrapped).unwrap();
        assert_eq!(value["user"]["roles"][1], "b");
        assert_eq!(value["meta"]["nested"][0], 1);
        assert!(value["none"].is_null());
    }

    #[test]
    fn test_numeric_time_and_duration() {
        let encoder = JsonEncoder::new(
            EncoderConfig::json()
                .with_time_format(TimestampFormat::UnixMillis)
                .with_duration_encoder(crate::core::DurationEncoder::Nanos),
        );
        let event = LogEvent::new(LogLevel::Info, "t")
            .with_field(Field::duration("took", Duration::from_micros(3)));
        let value = parse(&encoder.encode_entry(&event).unwrap());
        assert!(value["time"].is_i64());
        assert_eq!(value["took"], 3000);
    }

    #[test]
    fn test_spaced_output() {
        let mut encoder = JsonEncoder::new(EncoderConfig::json().with_spaced(true));
        encoder.add_i64("a", 1);
        encoder.add_i64("b", 2);
        assert_eq!(encoder.accumulated(), br#""a": 1, "b": 2"#);
    }
}
