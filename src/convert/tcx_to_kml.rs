// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! TCX to KML file conversion.

use std::fs;
use std::path::Path;

use crate::convert::kml::{render_kml, KmlTrack};
use crate::convert::tcx::parse_tcx;
use crate::error::{AppError, Result};
use crate::fs_utils::sorted_files_with_extension;

/// Per-file conversion outcome.
#[derive(Debug, Clone, Copy)]
pub struct ConversionOutcome {
    pub points: usize,
    pub laps: usize,
}

/// Aggregate statistics for a directory conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_points: usize,
    pub total_laps: usize,
}

/// Convert a single TCX file to KML.
///
/// Refuses to replace an existing output unless `overwrite` is set; a
/// TCX file without GPS points is an error.
pub fn convert_file(tcx_path: &Path, kml_path: &Path, overwrite: bool) -> Result<ConversionOutcome> {
    if kml_path.exists() && !overwrite {
        return Err(AppError::Convert(format!(
            "Output file already exists: {} (use --overwrite-destination to force)",
            kml_path.display()
        )));
    }

    let xml = fs::read_to_string(tcx_path)?;
    let track = parse_tcx(&xml)?;
    if track.points.is_empty() {
        return Err(AppError::Convert(format!(
            "No GPS points found in {}",
            tcx_path.display()
        )));
    }

    let name = tcx_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("track")
        .to_string();
    let kml_track = KmlTrack {
        name,
        coordinates: track.points.clone(),
    };

    if let Some(parent) = kml_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(kml_path, render_kml(&[kml_track]))?;

    tracing::info!(
        input = %tcx_path.display(),
        output = %kml_path.display(),
        points = track.points.len(),
        laps = track.laps,
        "Converted TCX to KML"
    );

    Ok(ConversionOutcome {
        points: track.points.len(),
        laps: track.laps,
    })
}

/// Convert all TCX files under `input_dir`, mirroring the relative tree
/// into `output_dir`. Per-file failures are counted, not fatal; an
/// input directory without any TCX files is an error.
pub fn convert_directory(
    input_dir: &Path,
    output_dir: &Path,
    overwrite: bool,
) -> Result<ConversionStats> {
    fs::create_dir_all(output_dir)?;

    let tcx_files = sorted_files_with_extension(input_dir, "tcx")?;
    if tcx_files.is_empty() {
        return Err(AppError::Convert(format!(
            "No TCX files found in {}",
            input_dir.display()
        )));
    }

    let mut stats = ConversionStats::default();
    for tcx_file in &tcx_files {
        let rel_path = tcx_file.strip_prefix(input_dir).unwrap_or(tcx_file);
        let kml_file = output_dir.join(rel_path).with_extension("kml");

        stats.total_files += 1;
        match convert_file(tcx_file, &kml_file, overwrite) {
            Ok(outcome) => {
                stats.successful += 1;
                stats.total_points += outcome.points;
                stats.total_laps += outcome.laps;
            }
            Err(err) => {
                stats.failed += 1;
                tracing::warn!(
                    input = %rel_path.display(),
                    error = %err,
                    "Conversion failed"
                );
            }
        }
    }

    Ok(stats)
}
