// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Download plan models.

use serde::{Deserialize, Serialize};

/// An individual TCX download task within a plan.
///
/// The URL is the identity of an item; `downloaded` flips false→true
/// exactly once and is persisted immediately afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadItem {
    pub url: String,
    pub path: String,
    #[serde(default)]
    pub downloaded: bool,
}

/// Metrics from a download run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub total_items: usize,
    pub downloaded: usize,
    pub already_downloaded: usize,
    pub failed: usize,
    pub dry_run_listed: usize,
}

/// Progress counts for a plan loaded from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanStats {
    pub total_items: usize,
    pub on_disk: usize,
}

impl PlanStats {
    pub fn remaining(&self) -> usize {
        self.total_items - self.on_disk
    }
}
