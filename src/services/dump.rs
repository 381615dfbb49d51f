// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bucketing of activity records into per-month JSON shards.

use chrono::{DateTime, Datelike, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::time_utils::coerce_timestamp;

/// Fields checked for an activity start time, in priority order.
const TIME_FIELDS: [&str; 5] = [
    "originalStartTime",
    "startDateTime",
    "startTime",
    "startDate",
    "startDateLocal",
];

/// Year/month key of a shard file.
pub type MonthKey = (i32, u32);

/// Return the (year, month) extracted from an activity payload, or
/// `None` when no recognized time field parses.
pub fn determine_activity_month(activity: &Value) -> Option<MonthKey> {
    let dt = extract_activity_datetime(activity)?;
    Some((dt.year(), dt.month()))
}

fn extract_activity_datetime(activity: &Value) -> Option<DateTime<Utc>> {
    for field in TIME_FIELDS {
        match activity.get(field) {
            None | Some(Value::Null) => continue,
            Some(value) => {
                if let Some(dt) = coerce_timestamp(value) {
                    return Some(dt);
                }
            }
        }
    }
    None
}

/// Group activities into month buckets, returning the buckets and the
/// number of records skipped for lack of a usable start time.
pub fn bucket_activities_by_month(
    activities: Vec<Value>,
) -> (BTreeMap<MonthKey, Vec<Value>>, usize) {
    let mut buckets: BTreeMap<MonthKey, Vec<Value>> = BTreeMap::new();
    let mut skipped = 0;

    for activity in activities {
        match determine_activity_month(&activity) {
            Some(key) => buckets.entry(key).or_default().push(activity),
            None => {
                skipped += 1;
                tracing::warn!(
                    activity_id = ?activity.get("logId"),
                    "Activity missing a recognizable start time"
                );
            }
        }
    }

    (buckets, skipped)
}

/// Persist activity buckets to `<root>/<YYYY>/<MM>.json` files.
pub fn write_month_buckets(
    buckets: &BTreeMap<MonthKey, Vec<Value>>,
    output_root: &Path,
) -> Result<BTreeMap<MonthKey, PathBuf>> {
    let mut written = BTreeMap::new();

    for ((year, month), activities) in buckets {
        let month_dir = output_root.join(format!("{year:04}"));
        fs::create_dir_all(&month_dir)?;
        let file_path = month_dir.join(format!("{month:02}.json"));
        let mut body = serde_json::to_string_pretty(activities)?;
        body.push('\n');
        fs::write(&file_path, body)?;
        written.insert((*year, *month), file_path);
    }

    Ok(written)
}
