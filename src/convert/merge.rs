// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Merging multiple KML files into a single document.

use std::fs;
use std::path::{Path, PathBuf};

use crate::convert::kml::{parse_kml_tracks, render_kml, KmlTrack};
use crate::error::{AppError, Result};
use crate::fs_utils::sorted_files_with_extension;

/// Summary information for a merge run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub files: usize,
    pub placemarks: usize,
    pub points: usize,
}

/// Result metadata for a merge run.
#[derive(Debug, Clone)]
pub struct MergeResult {
    pub stats: MergeStats,
    pub merged_files: Vec<PathBuf>,
    pub skipped_files: Vec<PathBuf>,
}

/// Return all KML files under `input_dir` (recursively), excluding the
/// output file itself when it lives inside the scanned tree.
pub fn collect_kml_files(input_dir: &Path, output_file: Option<&Path>) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(AppError::Convert(format!(
            "Input directory does not exist: {}",
            input_dir.display()
        )));
    }

    let mut files = sorted_files_with_extension(input_dir, "kml")?;
    if let Some(output) = output_file {
        let output_resolved = output.canonicalize().ok();
        files.retain(|candidate| match (&output_resolved, candidate.canonicalize()) {
            (Some(output), Ok(candidate)) => candidate != *output,
            _ => true,
        });
    }
    Ok(files)
}

/// Merge all KML files under `input_dir` into `output_file`.
///
/// Files without any LineString are reported as skipped; no LineString
/// anywhere is an error. Dry-run parses everything but writes nothing.
pub fn merge_kml_files(
    input_dir: &Path,
    output_file: &Path,
    overwrite: bool,
    dry_run: bool,
) -> Result<MergeResult> {
    let kml_files = collect_kml_files(input_dir, Some(output_file))?;
    if kml_files.is_empty() {
        return Err(AppError::Convert(format!(
            "No KML files found in {}",
            input_dir.display()
        )));
    }

    let mut tracks: Vec<KmlTrack> = Vec::new();
    let mut merged_files: Vec<PathBuf> = Vec::new();
    let mut skipped_files: Vec<PathBuf> = Vec::new();

    for kml_file in kml_files {
        let fallback_name = kml_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("track");
        let xml = fs::read_to_string(&kml_file)?;
        let extracted = parse_kml_tracks(&xml, fallback_name)?;

        if extracted.is_empty() {
            tracing::warn!(file = %kml_file.display(), "No LineStrings found in file");
            skipped_files.push(kml_file);
            continue;
        }
        merged_files.push(kml_file);
        tracks.extend(extracted);
    }

    if tracks.is_empty() {
        return Err(AppError::Convert(
            "No LineStrings found in any KML files".to_string(),
        ));
    }

    let stats = MergeStats {
        files: merged_files.len(),
        placemarks: tracks.len(),
        points: tracks.iter().map(|track| track.coordinates.len()).sum(),
    };

    if dry_run {
        return Ok(MergeResult {
            stats,
            merged_files,
            skipped_files,
        });
    }

    if output_file.exists() && !overwrite {
        return Err(AppError::Convert(format!(
            "Output file already exists: {}. Pass --overwrite to replace it.",
            output_file.display()
        )));
    }

    if let Some(parent) = output_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(output_file, render_kml(&tracks))?;
    tracing::info!(
        files = stats.files,
        placemarks = stats.placemarks,
        points = stats.points,
        output = %output_file.display(),
        "Merged KML files"
    );

    Ok(MergeResult {
        stats,
        merged_files,
        skipped_files,
    })
}
