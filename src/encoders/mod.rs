//! Built-in output formats

mod escape;
pub mod json;
pub mod plain;

pub use json::JsonEncoder;
pub use plain::{PlainEncoder, MISSING_CORRELATION_ID};

/// Registry name of the plain format
pub const PLAIN: &str = "plain";

/// Registry name of the JSON format
pub const JSON: &str = "json";
