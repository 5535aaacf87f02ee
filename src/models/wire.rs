//! Serde helpers for the server's loosely typed fields.
//!
//! Dates may arrive as `YYYY-MM-DD` or as a full ISO timestamp, times as
//! `HH:MM` or `HH:MM:SS`, and flags as booleans or `0`/`1`.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serializer};

use crate::error::ValidationError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// First `YYYY-MM-DD` of a date or timestamp string.
pub fn date_part(raw: &str) -> &str {
    raw.trim().get(..10).unwrap_or(raw.trim())
}

/// `HH:MM` slice of a `HH:MM[:SS]` time string.
pub fn time_part(raw: &str) -> &str {
    raw.trim().get(..5).unwrap_or(raw.trim())
}

/// `HH:MM` slice of an ISO timestamp (`YYYY-MM-DDTHH:MM:SS`), empty if there is none.
pub fn timestamp_time_part(raw: &str) -> &str {
    raw.trim().get(11..16).unwrap_or("")
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(date_part(raw), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(time_part(raw), TIME_FORMAT)
        .map_err(|_| ValidationError::InvalidTime(raw.to_string()))
}

pub mod date {
    use super::*;

    pub fn serialize<S: Serializer>(value: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&value.format(DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        parse_date(&raw).map_err(serde::de::Error::custom)
    }
}

pub mod time {
    use super::*;

    pub fn serialize<S: Serializer>(value: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&value.format(TIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse_time(&raw).map_err(serde::de::Error::custom)
    }
}

pub mod flag {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFlag {
        Bool(bool),
        Int(i64),
        Null(()),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match RawFlag::deserialize(d)? {
            RawFlag::Bool(b) => b,
            RawFlag::Int(n) => n != 0,
            RawFlag::Null(()) => false,
        })
    }
}

/// Accepts a number or a numeric string; anything else is treated as absent.
pub fn loose_i64(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// String coercion used by the natural key: null becomes empty.
pub fn loose_string(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_tolerate_short_and_long_inputs() {
        assert_eq!(date_part("2024-05-01T10:00:00"), "2024-05-01");
        assert_eq!(date_part("2024-05-01"), "2024-05-01");
        assert_eq!(time_part("10:00:00"), "10:00");
        assert_eq!(time_part("9"), "9");
        assert_eq!(timestamp_time_part("2024-05-01T10:30:00"), "10:30");
        assert_eq!(timestamp_time_part("2024-05-01"), "");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_date("01/05/2024").is_err());
        assert!(parse_time("25:00").is_err());
        assert_eq!(
            parse_time("08:15:00").unwrap(),
            NaiveTime::from_hms_opt(8, 15, 0).unwrap()
        );
    }

    #[test]
    fn loose_values() {
        assert_eq!(loose_i64(&serde_json::json!("42")), Some(42));
        assert_eq!(loose_i64(&serde_json::json!(7)), Some(7));
        assert_eq!(loose_i64(&serde_json::json!("evt-3")), None);
        assert_eq!(loose_string(Some(&serde_json::json!(12))), "12");
        assert_eq!(loose_string(Some(&serde_json::Value::Null)), "");
        assert_eq!(loose_string(None), "");
    }
}
