// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types.

/// Application error type covering API access, token handling and file
/// conversion failures.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A token refresh cannot proceed (no refresh token while one is
    /// required, or client credentials are unset).
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The Fitbit API answered with a non-success status after retries
    /// were exhausted.
    #[error("Fitbit API call failed with {status}: {body}")]
    Api { status: u16, body: String },

    /// An on-disk token document is missing required fields or cannot
    /// be interpreted.
    #[error("Malformed token file: {0}")]
    MalformedToken(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// TCX/KML conversion or merge failure.
    #[error("Conversion error: {0}")]
    Convert(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// True for errors raised by a non-success API response. These are
    /// counted per-item during a batch download instead of aborting it.
    pub fn is_api_error(&self) -> bool {
        matches!(self, AppError::Api { .. })
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AppError>;
