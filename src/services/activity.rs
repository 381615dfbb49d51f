// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity list fetching with pagination.

use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::services::FitbitClient;
use crate::FITBIT_API_BASE;

/// Path of the activity list endpoint, relative to the API base.
pub const ACTIVITY_LIST_PATH: &str = "/1/user/-/activities/list.json";

/// High-level helper that queries the Fitbit API for activities.
pub struct ActivityFetcher {
    client: FitbitClient,
    api_base: String,
    last_request_count: usize,
}

impl ActivityFetcher {
    pub fn new(client: FitbitClient) -> Self {
        Self {
            client,
            api_base: FITBIT_API_BASE.to_string(),
            last_request_count: 0,
        }
    }

    /// Override the API base URL (used by tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Fetch every activity recorded on or after `after_date`
    /// (`YYYY-MM-DD`), following the server-supplied pagination links.
    ///
    /// `page_size` must be within 1..=100; `sort` is `asc` or `desc`.
    pub async fn fetch_all(
        &mut self,
        after_date: &str,
        page_size: u32,
        sort: &str,
    ) -> Result<Vec<Value>> {
        if !(1..=100).contains(&page_size) {
            return Err(AppError::BadRequest(
                "page_size must be between 1 and 100".to_string(),
            ));
        }

        let mut page_url = format!("{}{}", self.api_base, ACTIVITY_LIST_PATH);
        let mut query = Some(vec![
            ("afterDate", after_date.to_string()),
            ("sort", sort.to_string()),
            ("limit", page_size.to_string()),
            ("offset", "0".to_string()),
        ]);
        self.last_request_count = 0;
        let mut activities: Vec<Value> = Vec::new();

        loop {
            let body = self.client.get_json(&page_url, query.as_deref()).await?;
            self.last_request_count += 1;

            let batch = body
                .get("activities")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            tracing::info!(
                page = self.last_request_count,
                fetched = batch.len(),
                "Fetched activities page"
            );
            activities.extend(batch);

            let next = body
                .get("pagination")
                .and_then(|p| p.get("next"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty());
            match next {
                Some(next_url) => {
                    // The next link already carries its own query string.
                    page_url = resolve_next_url(&self.api_base, next_url);
                    query = None;
                }
                None => break,
            }
        }

        Ok(activities)
    }

    /// Number of API requests performed by the last fetch.
    pub fn last_request_count(&self) -> usize {
        self.last_request_count
    }
}

/// Resolve a pagination link against the API base. Absolute links pass
/// through untouched.
fn resolve_next_url(base: &str, next: &str) -> String {
    match Url::parse(base).and_then(|b| b.join(next)) {
        Ok(url) => url.to_string(),
        Err(_) => next.to_string(),
    }
}
