// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for parsing and formatting timestamps.
//!
//! Fitbit payloads carry start times in several shapes: Unix epoch
//! numbers, full ISO-8601 strings (with or without an offset) and bare
//! `YYYY-MM-DD` dates. Everything is normalized to UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix. Sub-second
/// precision is kept when present so rewriting a stored timestamp does
/// not truncate it.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse an ISO-8601 timestamp, accepting any offset and treating naive
/// values as UTC. Bare dates parse to midnight UTC.
pub fn parse_iso8601_utc(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }
    None
}

/// Coerce a JSON value into a UTC timestamp.
///
/// Numbers are Unix epoch seconds (fractional allowed); strings go
/// through [`parse_iso8601_utc`]. Anything else yields `None`.
pub fn coerce_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(epoch) = value.as_f64() {
        return DateTime::from_timestamp_millis((epoch * 1000.0).round() as i64);
    }
    if let Some(text) = value.as_str() {
        return parse_iso8601_utc(text);
    }
    None
}
