//! Conversions between the calendar-date form shown to people (`YYYY-MM-DD`) and the
//! ISO-8601 forms used on disk and on the wire.

use crate::utils::error::{DocumentorError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

pub const CALENDAR_FORMAT: &str = "%Y-%m-%d";

/// Persisted dates carry one second past midnight and a UTC offset.
pub const PERSISTED_FORMAT: &str = "%Y-%m-%dT00:00:01+00:00";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Parses a calendar date out of either form. Anything after the `T` separator is
/// dropped first, so a timestamp never leaks time fragments into the calendar value.
pub fn parse_calendar(value: &str) -> Result<NaiveDate> {
    let date_part = value.trim().split('T').next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part, CALENDAR_FORMAT).map_err(|e| {
        DocumentorError::InvalidConfigValue {
            field: "date".to_string(),
            value: value.to_string(),
            reason: format!("expected YYYY-MM-DD: {}", e),
        }
    })
}

pub fn to_calendar(date: NaiveDate) -> String {
    date.format(CALENDAR_FORMAT).to_string()
}

pub fn to_persisted(date: NaiveDate) -> String {
    date.format(PERSISTED_FORMAT).to_string()
}

/// Midnight of `date` in `zone`, rendered as RFC 3339 for the search bounds.
pub fn search_bound(date: NaiveDate, zone: Tz) -> Result<String> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    zone.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.to_rfc3339())
        .ok_or_else(|| DocumentorError::InvalidConfigValue {
            field: "timezone".to_string(),
            value: zone.name().to_string(),
            reason: format!("midnight of {} does not exist in this zone", date),
        })
}

pub fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Token timestamps are compared as naive local time; an offset, if present, is dropped.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

/// Serde adapter storing a `NaiveDate` in the persisted ISO form.
pub mod persisted_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_persisted(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_calendar(&raw).map_err(de::Error::custom)
    }
}
