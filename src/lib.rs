// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitbit-to-KML: archive Fitbit activities and turn them into maps
//!
//! This crate downloads activity records and TCX GPS exports from the
//! Fitbit Web API, organizes them on disk by month, and converts the
//! downloaded TCX tracks into KML for mapping applications.

pub mod config;
pub mod convert;
pub mod error;
pub mod fs_utils;
pub mod models;
pub mod services;
pub mod time_utils;

/// Base URL for all Fitbit Web API calls.
pub const FITBIT_API_BASE: &str = "https://api.fitbit.com";
