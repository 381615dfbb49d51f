// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth token model and on-disk token file handling.
//!
//! The token file is a small JSON document. Fields the application does
//! not manage itself are round-tripped untouched, so a file written by
//! the interactive authorization script keeps its extra metadata.

use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::time_utils::{format_utc_rfc3339, parse_iso8601_utc};

/// Lookahead used when deciding whether a token is about to expire.
pub const EXPIRY_LOOKAHEAD_SECS: i64 = 60;

/// In-memory representation of Fitbit OAuth tokens.
#[derive(Debug, Clone)]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: Vec<String>,
    pub token_type: Option<String>,
    /// Original document, preserved for round-tripping unknown fields.
    raw: Map<String, Value>,
}

impl TokenData {
    /// Build a token from the JSON payload stored on disk (or returned
    /// by the token endpoint).
    pub fn from_value(payload: &Value) -> Result<Self> {
        let obj = payload.as_object().ok_or_else(|| {
            AppError::MalformedToken("token document must be a JSON object".to_string())
        })?;

        let access_token = obj
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::MalformedToken("missing access_token field".to_string()))?
            .to_string();

        let refresh_token = obj
            .get("refresh_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty());

        let expires_at = match obj.get("expires_at").and_then(Value::as_str) {
            Some(text) => Some(parse_iso8601_utc(text).ok_or_else(|| {
                AppError::MalformedToken(format!("unparseable expires_at: {text}"))
            })?),
            None => None,
        };

        let scope = match obj.get("scope") {
            Some(Value::String(s)) => s.split_whitespace().map(str::to_string).collect(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        };

        let token_type = obj
            .get("token_type")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            access_token,
            refresh_token,
            expires_at,
            scope,
            token_type,
            raw: obj.clone(),
        })
    }

    /// Serialize the token back into a JSON document.
    ///
    /// `access_token` and `token_type` are always emitted; empty
    /// optionals are omitted; unknown fields from the source document
    /// are copied through last.
    pub fn to_value(&self) -> Value {
        let mut data = Map::new();
        data.insert(
            "access_token".to_string(),
            Value::String(self.access_token.clone()),
        );
        data.insert(
            "token_type".to_string(),
            match &self.token_type {
                Some(t) => Value::String(t.clone()),
                None => Value::Null,
            },
        );
        if let Some(refresh_token) = &self.refresh_token {
            data.insert(
                "refresh_token".to_string(),
                Value::String(refresh_token.clone()),
            );
        }
        if let Some(expires_at) = self.expires_at {
            data.insert(
                "expires_at".to_string(),
                Value::String(format_utc_rfc3339(expires_at)),
            );
        }
        if !self.scope.is_empty() {
            data.insert("scope".to_string(), Value::String(self.scope.join(" ")));
        }
        for (key, value) in &self.raw {
            if !data.contains_key(key) {
                data.insert(key.clone(), value.clone());
            }
        }
        Value::Object(data)
    }

    /// True when the token is expired or will expire within `lookahead`.
    /// Tokens without an expiry never expire.
    pub fn will_expire_within(&self, lookahead: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= Utc::now() + lookahead,
            None => false,
        }
    }
}

/// Load token JSON from disk.
pub fn load_token_file(path: &Path) -> Result<TokenData> {
    let raw = fs::read_to_string(path)?;
    let payload: Value = serde_json::from_str(&raw)?;
    TokenData::from_value(&payload)
}

/// Persist token JSON to disk, creating parent directories as needed.
pub fn write_token_file(token: &TokenData, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut body = serde_json::to_string_pretty(&token.to_value())?;
    body.push('\n');
    fs::write(path, body)?;
    Ok(())
}
