// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Service layer: Fitbit API access, activity dumping and TCX download.

pub mod activity;
pub mod client;
pub mod dump;
pub mod tcx;

pub use activity::ActivityFetcher;
pub use client::FitbitClient;
pub use tcx::TcxDownloader;
