// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod plan;
pub mod token;

pub use plan::{DownloadItem, DownloadSummary, PlanStats};
pub use token::TokenData;
