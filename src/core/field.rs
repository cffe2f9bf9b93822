//! Typed key/value fields

use super::buffer::{self, Buffer};
use super::encoder::{ArrayMarshaler, ObjectEncoder, ObjectMarshaler};
use super::error::{LoggerError, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Key used by [`Field::error`]
pub const ERROR_KEY: &str = "error";

/// Complex number, rendered as `"re+imi"`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

impl From<(f64, f64)> for Complex {
    fn from((re, im): (f64, f64)) -> Self {
        Self { re, im }
    }
}

type RenderFn = dyn Fn(&mut dyn io::Write) -> serde_json::Result<()> + Send + Sync;

/// Any `serde::Serialize` value, rendered as JSON when the line is encoded.
#[derive(Clone)]
pub struct Reflected {
    render: Arc<RenderFn>,
}

impl Reflected {
    pub fn new<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self {
            render: Arc::new(move |w: &mut dyn io::Write| serde_json::to_writer(w, &value)),
        }
    }

    /// Serialize into a scratch buffer so a failure leaves the caller's
    /// buffer untouched.
    pub fn to_buffer(&self) -> Result<Buffer> {
        let mut scratch = buffer::get();
        (self.render)(&mut scratch).map_err(LoggerError::from)?;
        Ok(scratch)
    }
}

impl fmt::Debug for Reflected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_buffer() {
            Ok(buf) => write!(f, "Reflected({})", buf.to_string_lossy()),
            Err(err) => write!(f, "Reflected(<{}>)", err),
        }
    }
}

/// Text of an error plus its `source()` chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorValue {
    pub message: String,
    pub verbose: Option<String>,
}

impl ErrorValue {
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let message = err.to_string();
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        let verbose = if chain.is_empty() {
            None
        } else {
            Some(format!("{}: {}", message, chain.join(": ")))
        };
        Self { message, verbose }
    }
}

#[derive(Clone)]
pub enum FieldValue {
    Bool(bool),
    Int64(i64),
    Uint64(u64),
    Float64(f64),
    Float32(f32),
    String(String),
    ByteString(Vec<u8>),
    Duration(Duration),
    Time(DateTime<Local>),
    Complex(Complex),
    Object(Arc<dyn ObjectMarshaler>),
    Array(Arc<dyn ArrayMarshaler>),
    Reflected(Reflected),
    Error(ErrorValue),
    Namespace,
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(v) => write!(f, "Bool({v})"),
            FieldValue::Int64(v) => write!(f, "Int64({v})"),
            FieldValue::Uint64(v) => write!(f, "Uint64({v})"),
            FieldValue::Float64(v) => write!(f, "Float64({v})"),
            FieldValue::Float32(v) => write!(f, "Float32({v})"),
            FieldValue::String(v) => write!(f, "String({v:?})"),
            FieldValue::ByteString(v) => write!(f, "ByteString({:?})", String::from_utf8_lossy(v)),
            FieldValue::Duration(v) => write!(f, "Duration({v:?})"),
            FieldValue::Time(v) => write!(f, "Time({v})"),
            FieldValue::Complex(v) => write!(f, "Complex({}, {})", v.re, v.im),
            FieldValue::Object(_) => f.write_str("Object(..)"),
            FieldValue::Array(_) => f.write_str("Array(..)"),
            FieldValue::Reflected(v) => v.fmt(f),
            FieldValue::Error(v) => write!(f, "Error({:?})", v.message),
            FieldValue::Namespace => f.write_str("Namespace"),
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

impl_from_value! {
    bool => |v| FieldValue::Bool(v),
    i8 => |v| FieldValue::Int64(v.into()),
    i16 => |v| FieldValue::Int64(v.into()),
    i32 => |v| FieldValue::Int64(v.into()),
    i64 => |v| FieldValue::Int64(v),
    isize => |v| FieldValue::Int64(v as i64),
    u8 => |v| FieldValue::Uint64(v.into()),
    u16 => |v| FieldValue::Uint64(v.into()),
    u32 => |v| FieldValue::Uint64(v.into()),
    u64 => |v| FieldValue::Uint64(v),
    usize => |v| FieldValue::Uint64(v as u64),
    f32 => |v| FieldValue::Float32(v),
    f64 => |v| FieldValue::Float64(v),
    &str => |v| FieldValue::String(v.to_owned()),
    String => |v| FieldValue::String(v),
    &String => |v| FieldValue::String(v.clone()),
    Duration => |v| FieldValue::Duration(v),
    DateTime<Local> => |v| FieldValue::Time(v),
    DateTime<Utc> => |v| FieldValue::Time(v.with_timezone(&Local)),
    Complex => |v| FieldValue::Complex(v),
}

/// A key plus a typed value. Duplicate keys are kept in order.
#[derive(Debug, Clone)]
pub struct Field {
    pub key: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, FieldValue::Bool(value))
    }

    pub fn int(key: impl Into<String>, value: impl Into<i64>) -> Self {
        Self::new(key, FieldValue::Int64(value.into()))
    }

    pub fn uint(key: impl Into<String>, value: impl Into<u64>) -> Self {
        Self::new(key, FieldValue::Uint64(value.into()))
    }

    pub fn float(key: impl Into<String>, value: f64) -> Self {
        Self::new(key, FieldValue::Float64(value))
    }

    pub fn float32(key: impl Into<String>, value: f32) -> Self {
        Self::new(key, FieldValue::Float32(value))
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, FieldValue::String(value.into()))
    }

    pub fn byte_string(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::new(key, FieldValue::ByteString(value.into()))
    }

    pub fn duration(key: impl Into<String>, value: Duration) -> Self {
        Self::new(key, FieldValue::Duration(value))
    }

    pub fn time(key: impl Into<String>, value: DateTime<Local>) -> Self {
        Self::new(key, FieldValue::Time(value))
    }

    pub fn complex(key: impl Into<String>, re: f64, im: f64) -> Self {
        Self::new(key, FieldValue::Complex(Complex::new(re, im)))
    }

    pub fn object(key: impl Into<String>, value: impl ObjectMarshaler + 'static) -> Self {
        Self::new(key, FieldValue::Object(Arc::new(value)))
    }

    pub fn array(key: impl Into<String>, value: impl ArrayMarshaler + 'static) -> Self {
        Self::new(key, FieldValue::Array(Arc::new(value)))
    }

    pub fn strings<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        Self::array(key, values)
    }

    pub fn ints(key: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        Self::array(key, values.into_iter().collect::<Vec<_>>())
    }

    /// Any serializable value, rendered with `serde_json`
    pub fn reflected<T>(key: impl Into<String>, value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self::new(key, FieldValue::Reflected(Reflected::new(value)))
    }

    /// `error` field, plus `errorVerbose` when the error has a cause chain
    pub fn error(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::named_error(ERROR_KEY, err)
    }

    pub fn named_error(key: impl Into<String>, err: &(dyn std::error::Error + 'static)) -> Self {
        Self::new(key, FieldValue::Error(ErrorValue::from_error(err)))
    }

    /// Opens a namespace when added; later keys nest under `key`
    pub fn namespace(key: impl Into<String>) -> Self {
        Self::new(key, FieldValue::Namespace)
    }

    /// Write this field into an encoder.
    pub fn add_to<E: ObjectEncoder + ?Sized>(&self, enc: &mut E) -> Result<()> {
        let key = self.key.as_str();
        match &self.value {
            FieldValue::Bool(v) => enc.add_bool(key, *v),
            FieldValue::Int64(v) => enc.add_i64(key, *v),
            FieldValue::Uint64(v) => enc.add_u64(key, *v),
            FieldValue::Float64(v) => enc.add_f64(key, *v),
            FieldValue::Float32(v) => enc.add_f32(key, *v),
            FieldValue::String(v) => enc.add_str(key, v),
            FieldValue::ByteString(v) => enc.add_byte_str(key, v),
            FieldValue::Duration(v) => enc.add_duration(key, *v),
            FieldValue::Time(v) => enc.add_time(key, v),
            FieldValue::Complex(v) => enc.add_complex(key, *v),
            FieldValue::Object(v) => enc.add_object(key, v.as_ref())?,
            FieldValue::Array(v) => enc.add_array(key, v.as_ref())?,
            FieldValue::Reflected(v) => enc.add_reflected(key, v)?,
            FieldValue::Error(v) => {
                enc.add_str(key, &v.message);
                if let Some(verbose) = &v.verbose {
                    enc.add_str(&format!("{key}Verbose"), verbose);
                }
            }
            FieldValue::Namespace => enc.open_namespace(key),
        }
        Ok(())
    }
}

impl<K, V> From<(K, V)> for Field
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from((key, value): (K, V)) -> Self {
        Field::new(key, value)
    }
}

/// A list of fields renders as a nested object.
impl ObjectMarshaler for Vec<Field> {
    fn marshal_log_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
        for field in self {
            field.add_to(enc)?;
        }
        Ok(())
    }
}
