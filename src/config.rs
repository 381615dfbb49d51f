// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! The OAuth client credentials are optional at startup: they are only
//! required at the moment a token refresh actually has to happen.

use std::env;
use std::path::PathBuf;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Fitbit OAuth client ID (`FB_CLIENT_ID`)
    pub client_id: Option<String>,
    /// Fitbit OAuth client secret (`FB_CLIENT_SECRET`)
    pub client_secret: Option<String>,
    /// Default path of the OAuth token file
    pub token_file: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self {
            client_id: env_non_empty("FB_CLIENT_ID"),
            client_secret: env_non_empty("FB_CLIENT_SECRET"),
            token_file: default_token_file(),
        }
    }
}

/// Determine the default token file path.
///
/// `FB_TOKENS_FILE` wins, then `FB_CLIENT_SECRET_FILE`, then a plain
/// `tokens.json` in the working directory.
pub fn default_token_file() -> PathBuf {
    env_non_empty("FB_TOKENS_FILE")
        .or_else(|| env_non_empty("FB_CLIENT_SECRET_FILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tokens.json"))
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
