//! # Utilities Module
//!
//! This module contains helper functions and utilities used
//! across the backend service.

use chrono::TimeZone;

/// Format used for dates in requests and responses.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format used for datetimes in requests and responses.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp the way every JSON payload of the service does.
///
/// ## Examples
///
/// ```rust,ignore
/// let ts = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
/// assert_eq!(format_datetime(ts), "2024-01-15 12:00:00");
/// ```
pub fn format_datetime<Tz>(timestamp: chrono::DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    timestamp.format(DATETIME_FORMAT).to_string()
}

/// Serde helper for `NaiveDateTime` fields using [`DATETIME_FORMAT`].
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct Event {
///     #[serde(with = "crate::utils::datetime_format")]
///     at: NaiveDateTime,
/// }
/// ```
pub mod datetime_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::DATETIME_FORMAT;

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(DATETIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Same as [`datetime_format`] for optional fields. `null` maps to `None`.
pub mod optional_datetime_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::DATETIME_FORMAT;

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serializer.serialize_str(&v.format(DATETIME_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT))
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}

/// Truncate a string to a maximum length.
///
/// Useful for keeping request bodies short in log lines and alerts.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return s.chars().take(max_len).collect();
    }

    let half = (max_len - 3) / 2;
    let head: String = s.chars().take(half).collect();
    let tail: String = {
        let reversed: Vec<char> = s.chars().rev().take(half).collect();
        reversed.into_iter().rev().collect()
    };
    format!("{}...{}", head, tail)
}
