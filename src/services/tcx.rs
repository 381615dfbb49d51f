// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! TCX download planning and resumable execution.
//!
//! A plan is an ordered list of (url, destination, downloaded) items
//! persisted as a single JSON document. The document is rewritten after
//! every successful download, so an interrupted run loses at most the
//! in-flight item.

use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{AppError, Result};
use crate::fs_utils::sorted_files_with_extension;
use crate::models::{DownloadItem, DownloadSummary, PlanStats};
use crate::services::FitbitClient;

/// Accept header sent when fetching TCX exports.
pub const TCX_ACCEPT: &str = "application/vnd.garmin.tcx+xml,application/xml;q=0.9,*/*;q=0.8";

/// Downloads TCX files referenced inside activity dumps.
pub struct TcxDownloader {
    client: FitbitClient,
}

impl TcxDownloader {
    pub fn new(client: FitbitClient) -> Self {
        Self { client }
    }

    /// Execute a plan sequentially.
    ///
    /// Already-downloaded items are skipped without a network call. In
    /// dry-run mode nothing touches the network: items are only
    /// classified and counted. When `plan_path` is set, the whole plan
    /// document is rewritten after every successful item. A per-item
    /// API failure is counted and the run continues.
    pub async fn download_plan(
        &mut self,
        items: &mut [DownloadItem],
        plan_path: Option<&Path>,
        dry_run: bool,
    ) -> Result<DownloadSummary> {
        let mut summary = DownloadSummary {
            total_items: items.len(),
            ..Default::default()
        };

        if dry_run {
            summary.already_downloaded = items.iter().filter(|item| item.downloaded).count();
            summary.dry_run_listed = summary.total_items - summary.already_downloaded;
            return Ok(summary);
        }

        for index in 0..items.len() {
            if items[index].downloaded {
                summary.already_downloaded += 1;
                continue;
            }

            let url = items[index].url.clone();
            let destination = PathBuf::from(&items[index].path);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }

            let content = match self.download_tcx(&url).await {
                Ok(bytes) => bytes,
                Err(err) if err.is_api_error() => {
                    summary.failed += 1;
                    tracing::error!(link = %url, error = %err, "TCX download failed");
                    continue;
                }
                Err(err) => return Err(err),
            };

            fs::write(&destination, &content)?;
            items[index].downloaded = true;
            summary.downloaded += 1;
            tracing::info!(link = %url, target = %destination.display(), "TCX downloaded");

            if let Some(plan_path) = plan_path {
                save_plan(items, plan_path)?;
            }
        }

        Ok(summary)
    }

    /// Download the TCX payload for a single activity.
    pub async fn download_tcx(&mut self, link: &str) -> Result<Vec<u8>> {
        self.client.get_bytes(link, TCX_ACCEPT).await
    }
}

/// Build a download plan by scanning `YYYY/MM.json` activity dumps.
///
/// Destination files default to the activities directory when no output
/// directory is given. Items whose destination already exists on disk
/// are marked downloaded up front.
pub fn collect_plan(
    activities_dir: &Path,
    output_dir: Option<&Path>,
) -> Result<Vec<DownloadItem>> {
    let output_root = output_dir.unwrap_or(activities_dir);
    let mut items: Vec<DownloadItem> = Vec::new();
    let mut seen_urls: HashSet<String> = HashSet::new();

    for json_file in sorted_files_with_extension(activities_dir, "json")? {
        let rel_path = json_file.strip_prefix(activities_dir).unwrap_or(&json_file);

        let Some((year, month)) = resolve_year_month(rel_path) else {
            tracing::warn!(
                path = %rel_path.display(),
                "Activity file path does not encode year/month"
            );
            continue;
        };

        let activities = match load_json_array(&json_file) {
            Ok(list) => list,
            Err(err) => {
                tracing::warn!(
                    path = %rel_path.display(),
                    error = %err,
                    "Skipping unreadable activity file"
                );
                continue;
            }
        };

        for activity in &activities {
            if !activity_has_distance(activity) || !activity_has_gps(activity) {
                continue;
            }

            let Some(link) = extract_tcx_link(activity) else {
                continue;
            };
            if seen_urls.contains(&link) {
                continue;
            }

            let Some(tcx_id) = extract_tcx_id(&link) else {
                tracing::warn!(link, "TCX link does not end in a .tcx file name");
                continue;
            };

            let output_file = output_root.join(&year).join(format!("{month}_{tcx_id}.tcx"));
            items.push(DownloadItem {
                url: link.clone(),
                path: output_file.to_string_lossy().into_owned(),
                downloaded: output_file.exists(),
            });
            seen_urls.insert(link);
        }
    }

    Ok(items)
}

/// Persist a plan as a JSON array, creating parent directories.
pub fn save_plan(plan: &[DownloadItem], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut body = serde_json::to_string_pretty(plan)?;
    body.push('\n');
    fs::write(path, body)?;
    Ok(())
}

/// Load a plan from disk. The document must be a JSON array; extra
/// fields on items are tolerated.
pub fn load_plan(path: &Path) -> Result<Vec<DownloadItem>> {
    let raw = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw)?;
    if !value.is_array() {
        return Err(AppError::BadRequest(format!(
            "Plan file must be a JSON array: {}",
            path.display()
        )));
    }
    Ok(serde_json::from_value(value)?)
}

/// Count plan entries along with those already marked downloaded.
pub fn summarize_plan_progress(plan: &[DownloadItem]) -> PlanStats {
    PlanStats {
        total_items: plan.len(),
        on_disk: plan.iter().filter(|item| item.downloaded).count(),
    }
}

/// Parse the `<year>/<month>.json` shape out of a shard's relative
/// path. The year component must be all digits.
fn resolve_year_month(rel_path: &Path) -> Option<(String, String)> {
    let parts: Vec<_> = rel_path.components().collect();
    if parts.len() < 2 {
        return None;
    }
    let year = parts[0].as_os_str().to_str()?;
    if year.is_empty() || !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let month = rel_path.file_stem()?.to_str()?;
    if month.is_empty() {
        return None;
    }
    Some((year.to_string(), month.to_string()))
}

/// Read a shard file as a JSON array, also accepting an object with an
/// `activities` array field.
fn load_json_array(path: &Path) -> Result<Vec<Value>> {
    let payload: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    match payload {
        Value::Array(list) => Ok(list),
        Value::Object(mut obj) => match obj.remove("activities") {
            Some(Value::Array(list)) => Ok(list),
            _ => Err(AppError::BadRequest(format!(
                "Unexpected JSON shape in {}",
                path.display()
            ))),
        },
        _ => Err(AppError::BadRequest(format!(
            "Unexpected JSON shape in {}",
            path.display()
        ))),
    }
}

/// Extract the TCX export link, checking both field spellings. A
/// spelling that is null, empty or not a string falls through to the
/// next one.
fn extract_tcx_link(activity: &Value) -> Option<String> {
    ["tcx_link", "tcxLink"].iter().find_map(|key| {
        let link = activity.get(*key)?.as_str()?.trim();
        if link.is_empty() {
            return None;
        }
        Some(link.to_string())
    })
}

/// Identifier parsed from the final URL path segment, minus the `.tcx`
/// suffix.
fn extract_tcx_id(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let name = url.path_segments()?.last()?;
    if !name.to_ascii_lowercase().ends_with(".tcx") {
        return None;
    }
    Some(name[..name.len() - 4].to_string())
}

/// True if the activity contains a positive distance (number or
/// numeric string).
fn activity_has_distance(activity: &Value) -> bool {
    match activity.get("distance") {
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v > 0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().is_ok_and(|v| v > 0.0),
        _ => false,
    }
}

/// True if the activity reports GPS data (bool or string flag).
fn activity_has_gps(activity: &Value) -> bool {
    match activity.get("hasGps") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => {
            matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
        }
        _ => false,
    }
}
