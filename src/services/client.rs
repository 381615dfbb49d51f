// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitbit API client with OAuth token lifecycle management.
//!
//! Handles:
//! - Bearer-authorized requests
//! - Proactive token refresh when the stored token is about to expire
//! - One forced refresh-and-retry on the first 401
//! - Bounded backoff on 429 rate limit responses
//!
//! Requests are strictly sequential: the client takes `&mut self` so a
//! single caller drives one request at a time, which is exactly what the
//! per-account Fitbit rate limit wants.

use chrono::{Duration, Utc};
use reqwest::header::ACCEPT;
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::token::{
    load_token_file, write_token_file, TokenData, EXPIRY_LOOKAHEAD_SECS,
};
use crate::time_utils::format_utc_rfc3339;

/// Fitbit OAuth token endpoint.
pub const TOKEN_ENDPOINT: &str = "https://api.fitbit.com/oauth2/token";

/// Service-specific header carrying seconds until the rate limit resets.
const RATE_LIMIT_RESET_HEADER: &str = "Fitbit-Rate-Limit-Reset";

/// Default cap on 429 retries for a single logical request.
const DEFAULT_RATE_LIMIT_RETRIES: u32 = 5;

/// Fitbit API client that owns the stored token and persists refreshes.
pub struct FitbitClient {
    http: reqwest::Client,
    token_path: PathBuf,
    token: TokenData,
    client_id: Option<String>,
    client_secret: Option<String>,
    max_rate_limit_retries: u32,
    token_endpoint: String,
}

impl FitbitClient {
    /// Create a client backed by the token file at `token_file`.
    ///
    /// Fails when the token file is missing or malformed.
    pub fn new(token_file: &Path, config: &Config) -> Result<Self> {
        let token = load_token_file(token_file)?;
        Ok(Self {
            http: reqwest::Client::new(),
            token_path: token_file.to_path_buf(),
            token,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            max_rate_limit_retries: DEFAULT_RATE_LIMIT_RETRIES,
            token_endpoint: TOKEN_ENDPOINT.to_string(),
        })
    }

    /// Override the token endpoint (used by tests).
    pub fn with_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = endpoint.into();
        self
    }

    /// Override the 429 retry cap.
    pub fn with_max_rate_limit_retries(mut self, retries: u32) -> Self {
        self.max_rate_limit_retries = retries;
        self
    }

    /// The currently loaded token.
    pub fn token(&self) -> &TokenData {
        &self.token
    }

    /// GET a URL and parse the JSON body.
    pub async fn get_json(
        &mut self,
        url: &str,
        query: Option<&[(&str, String)]>,
    ) -> Result<Value> {
        let response = self
            .send_authorized(Method::GET, url, query, "application/json")
            .await?;
        Ok(response.json().await?)
    }

    /// GET a URL and return the raw body bytes, sending a custom Accept
    /// header (used for TCX exports).
    pub async fn get_bytes(&mut self, url: &str, accept: &str) -> Result<Vec<u8>> {
        let response = self
            .send_authorized(Method::GET, url, None, accept)
            .await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Perform an authorized request, refreshing tokens when needed.
    ///
    /// Retries once after a forced refresh on the first 401, and up to
    /// `max_rate_limit_retries` times on 429. Any other status >= 400 is
    /// an immediate [`AppError::Api`].
    async fn send_authorized(
        &mut self,
        method: Method,
        url: &str,
        query: Option<&[(&str, String)]>,
        accept: &str,
    ) -> Result<Response> {
        let mut rate_limit_attempts: u32 = 0;
        let mut retry_auth = true;

        loop {
            self.ensure_fresh_token().await?;

            let mut builder = self
                .http
                .request(method.clone(), url)
                .header(ACCEPT, accept)
                .bearer_auth(&self.token.access_token);
            if let Some(query) = query {
                builder = builder.query(query);
            }
            let response = builder.send().await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && retry_auth {
                tracing::info!(url, "Access token rejected, forcing a refresh");
                self.refresh_access_token(true).await?;
                retry_auth = false;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS
                && rate_limit_attempts < self.max_rate_limit_retries
            {
                let delay = rate_limit_delay(
                    header_value(&response, "Retry-After"),
                    header_value(&response, RATE_LIMIT_RESET_HEADER),
                    rate_limit_attempts,
                );
                rate_limit_attempts += 1;
                tracing::warn!(
                    url,
                    wait_seconds = delay,
                    wait_hhmm = %format_hhmmss(delay),
                    attempt = rate_limit_attempts,
                    "Fitbit rate limit hit, backing off"
                );
                tokio::time::sleep(std::time::Duration::from_secs_f64(delay)).await;
                continue;
            }

            if status.as_u16() >= 400 {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            return Ok(response);
        }
    }

    /// Refresh proactively when the stored token is about to expire.
    ///
    /// Best-effort: a token without a refresh token is left in place and
    /// used as-is.
    async fn ensure_fresh_token(&mut self) -> Result<()> {
        if self
            .token
            .will_expire_within(Duration::seconds(EXPIRY_LOOKAHEAD_SECS))
        {
            tracing::info!("Token expiring soon, refreshing");
            self.refresh_access_token(false).await?;
        }
        Ok(())
    }

    /// Refresh the OAuth token and persist the response.
    ///
    /// When `force` is false and no refresh token exists, this is a
    /// silent no-op; when `force` is true it is an authentication error.
    pub async fn refresh_access_token(&mut self, force: bool) -> Result<()> {
        let Some(refresh_token) = self.token.refresh_token.clone() else {
            if force {
                return Err(AppError::Auth("Refresh token is missing".to_string()));
            }
            return Ok(());
        };

        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret)
        else {
            return Err(AppError::Auth(
                "Refreshing tokens requires FB_CLIENT_ID and FB_CLIENT_SECRET".to_string(),
            ));
        };

        let response = self
            .http
            .post(&self.token_endpoint)
            .basic_auth(client_id, Some(client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let mut payload: Value = response.json().await?;
        stamp_expiry(&mut payload);

        let token = TokenData::from_value(&payload)?;
        write_token_file(&token, &self.token_path)?;
        self.token = token;
        tracing::info!(path = %self.token_path.display(), "Token refreshed");
        Ok(())
    }
}

/// Compute an absolute `expires_at` on a token endpoint response.
///
/// A relative `expires_in` wins; an already-absolute `expires_at` is
/// kept; with neither, the token is stamped as expiring now.
fn stamp_expiry(payload: &mut Value) {
    let Some(obj) = payload.as_object_mut() else {
        return;
    };
    if let Some(expires_in) = obj.get("expires_in").and_then(Value::as_i64) {
        let expiration = Utc::now() + Duration::seconds(expires_in);
        obj.insert(
            "expires_at".to_string(),
            Value::String(format_utc_rfc3339(expiration)),
        );
    } else if !obj.contains_key("expires_at") {
        obj.insert(
            "expires_at".to_string(),
            Value::String(format_utc_rfc3339(Utc::now())),
        );
    }
}

fn header_value<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name)?.to_str().ok()
}

/// Compute the delay in seconds before retrying a 429 response.
///
/// `Retry-After` wins, then the Fitbit reset header, both floored at one
/// second and read literally as seconds-to-wait. Without either header,
/// exponential backoff capped at 60 seconds.
fn rate_limit_delay(retry_after: Option<&str>, reset_header: Option<&str>, attempt: u32) -> f64 {
    if let Some(seconds) = retry_after.and_then(|v| v.trim().parse::<f64>().ok()) {
        return seconds.max(1.0);
    }
    if let Some(seconds) = reset_header.and_then(|v| v.trim().parse::<f64>().ok()) {
        return seconds.max(1.0);
    }
    2.0_f64.powi(attempt as i32).clamp(1.0, 60.0)
}

/// Return a zero-padded HH:MM:SS string for the provided seconds value.
fn format_hhmmss(seconds: f64) -> String {
    let total_seconds = seconds.ceil().max(0.0) as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}
