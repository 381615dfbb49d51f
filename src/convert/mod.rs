// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Offline TCX/KML conversion. Operates purely on local files; nothing
//! here touches the network.

pub mod kml;
pub mod merge;
pub mod tcx;
pub mod tcx_to_kml;

pub use kml::{Coordinate, KmlTrack};
pub use merge::{merge_kml_files, MergeResult, MergeStats};
pub use tcx_to_kml::{convert_directory, convert_file, ConversionStats};
