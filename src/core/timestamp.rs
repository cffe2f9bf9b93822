//! Timestamp formatting utilities
//!
//! Time renderers for the `time` column. The default layout is local time
//! with microseconds (`2024-01-02 15:04:05.000000`); ISO 8601, RFC 3339,
//! Unix timestamps and custom strftime layouts are also available.

use super::encoder::ArrayEncoder;
use super::error::{LoggerError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// strftime layout of the default time column
pub const DEFAULT_TIME_LAYOUT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Timestamp format options
///
/// # Examples
///
/// ```
/// use rust_field_logger::core::TimestampFormat;
///
/// let format = TimestampFormat::Iso8601;
/// let timestamp = format.format(&chrono::Local::now());
/// assert!(timestamp.contains('T'));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// `2025-01-08 10:30:45.123456` in the event's own time zone
    #[default]
    Layout,

    /// ISO 8601 with milliseconds: `2025-01-08T10:30:45.123+00:00`
    Iso8601,

    /// ISO 8601 with microseconds: `2025-01-08T10:30:45.123456+00:00`
    Iso8601Micros,

    /// RFC 3339 format: `2025-01-08T10:30:45+00:00`
    Rfc3339,

    /// Unix timestamp in seconds: `1736332245`
    Unix,

    /// Unix timestamp in milliseconds: `1736332245123`
    UnixMillis,

    /// Unix timestamp in microseconds: `1736332245123456`
    UnixMicros,

    /// Custom strftime format. A layout chrono cannot render falls back to
    /// [`DEFAULT_TIME_LAYOUT`]; [`validate`](Self::validate) reports it up front.
    ///
    /// ```
    /// use rust_field_logger::core::TimestampFormat;
    ///
    /// let format = TimestampFormat::Custom("%d/%b/%Y:%H:%M:%S %z".to_string());
    /// assert!(format.validate().is_ok());
    /// ```
    Custom(String),
}

impl TimestampFormat {
    /// Format a timestamp according to this format
    #[must_use]
    pub fn format<Tz>(&self, datetime: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        match self {
            TimestampFormat::Layout => datetime.format(DEFAULT_TIME_LAYOUT).to_string(),
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string(),
            TimestampFormat::Iso8601Micros => {
                datetime.format("%Y-%m-%dT%H:%M:%S%.6f%:z").to_string()
            }
            TimestampFormat::Rfc3339 => datetime.to_rfc3339(),
            TimestampFormat::Unix => datetime.timestamp().to_string(),
            TimestampFormat::UnixMillis => datetime.timestamp_millis().to_string(),
            TimestampFormat::UnixMicros => datetime.timestamp_micros().to_string(),
            TimestampFormat::Custom(format_str) => {
                let mut out = String::with_capacity(format_str.len() + 16);
                if write!(out, "{}", datetime.format(format_str)).is_err() {
                    out.clear();
                    out.push_str(&datetime.format(DEFAULT_TIME_LAYOUT).to_string());
                }
                out
            }
        }
    }

    /// Reject custom layouts that chrono cannot parse
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` naming the offending layout
    pub fn validate(&self) -> Result<()> {
        if let TimestampFormat::Custom(format_str) = self {
            if StrftimeItems::new(format_str).any(|item| matches!(item, Item::Error)) {
                return Err(LoggerError::config(
                    "time format",
                    format!("invalid strftime layout {:?}", format_str),
                ));
            }
        }
        Ok(())
    }

    /// Render into an encoder: numeric formats as integers, the rest as strings
    pub fn encode(&self, datetime: &DateTime<Local>, enc: &mut dyn ArrayEncoder) {
        match self {
            TimestampFormat::Unix => enc.append_i64(datetime.timestamp()),
            TimestampFormat::UnixMillis => enc.append_i64(datetime.timestamp_millis()),
            TimestampFormat::UnixMicros => enc.append_i64(datetime.timestamp_micros()),
            _ => enc.append_str(&self.format(datetime)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn fixed_datetime() -> DateTime<Utc> {
        // 2025-01-08 10:30:45.123456 UTC
        Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45)
            .single()
            .expect("valid datetime")
            + chrono::Duration::microseconds(123456)
    }

    #[test]
    fn test_layout_format() {
        let result = TimestampFormat::Layout.format(&fixed_datetime());
        assert_eq!(result, "2025-01-08 10:30:45.123456");
    }

    #[test]
    fn test_layout_keeps_offset_wall_clock() {
        let tz = FixedOffset::east_opt(3600).expect("valid offset");
        let result = TimestampFormat::Layout.format(&fixed_datetime().with_timezone(&tz));
        assert_eq!(result, "2025-01-08 11:30:45.123456");
    }

    #[test]
    fn test_iso8601_format() {
        let result = TimestampFormat::Iso8601.format(&fixed_datetime());
        assert_eq!(result, "2025-01-08T10:30:45.123+00:00");
    }

    #[test]
    fn test_iso8601_micros_format() {
        let result = TimestampFormat::Iso8601Micros.format(&fixed_datetime());
        assert_eq!(result, "2025-01-08T10:30:45.123456+00:00");
    }

    #[test]
    fn test_rfc3339_format() {
        let result = TimestampFormat::Rfc3339.format(&fixed_datetime());
        assert!(result.starts_with("2025-01-08T10:30:45"));
        assert!(result.contains("+00:00") || result.ends_with('Z'));
    }

    #[test]
    fn test_unix_formats_increase_in_precision() {
        let secs: i64 = TimestampFormat::Unix.format(&fixed_datetime()).parse().unwrap();
        let millis: i64 = TimestampFormat::UnixMillis
            .format(&fixed_datetime())
            .parse()
            .unwrap();
        let micros: i64 = TimestampFormat::UnixMicros
            .format(&fixed_datetime())
            .parse()
            .unwrap();
        assert_eq!(secs, 1736332245);
        assert_eq!(millis, 1736332245123);
        assert_eq!(micros, 1736332245123456);
    }

    #[test]
    fn test_custom_format() {
        let format = TimestampFormat::Custom("%Y/%m/%d %H:%M".to_string());
        assert_eq!(format.format(&fixed_datetime()), "2025/01/08 10:30");
    }

    #[test]
    fn test_default_is_layout() {
        assert_eq!(TimestampFormat::default(), TimestampFormat::Layout);
    }

    #[test]
    fn test_invalid_custom_layout() {
        let format = TimestampFormat::Custom("%Q".to_string());
        assert!(matches!(
            format.validate(),
            Err(LoggerError::InvalidConfiguration { .. })
        ));
        assert_eq!(format.format(&fixed_datetime()), "2025-01-08 10:30:45.123456");
        assert!(TimestampFormat::Custom("%Y".to_string()).validate().is_ok());
        assert!(TimestampFormat::Unix.validate().is_ok());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&TimestampFormat::Iso8601).expect("serialize");
        assert_eq!(json, "\"Iso8601\"");

        let format: TimestampFormat =
            serde_json::from_str(r#"{"Custom":"%Y-%m-%d"}"#).expect("deserialize Custom");
        assert_eq!(format, TimestampFormat::Custom("%Y-%m-%d".to_string()));
    }
}
