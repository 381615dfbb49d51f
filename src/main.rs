// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitbit-to-KML command line tool
//!
//! Dumps Fitbit activities into monthly JSON files, downloads the
//! referenced TCX exports, and converts/merges them into KML.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fitbit_to_kml::config::Config;
use fitbit_to_kml::convert::{convert_directory, convert_file, merge_kml_files};
use fitbit_to_kml::error::AppError;
use fitbit_to_kml::models::DownloadItem;
use fitbit_to_kml::services::dump::{bucket_activities_by_month, write_month_buckets};
use fitbit_to_kml::services::tcx::{
    collect_plan, load_plan, save_plan, summarize_plan_progress,
};
use fitbit_to_kml::services::{ActivityFetcher, FitbitClient, TcxDownloader};

#[derive(Parser)]
#[command(name = "fitbit-to-kml", version, about = "Archive Fitbit activities and convert them to KML")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Dump every Fitbit activity into YYYY/MM.json files
    DumpActivities {
        /// Path to the OAuth tokens file
        #[arg(long)]
        token_file: Option<PathBuf>,
        /// Directory where YYYY/MM.json files are written
        #[arg(long, short = 'o', default_value = "data/fitbit_activities")]
        output_dir: PathBuf,
        /// Fetch activities recorded on or after this YYYY-MM-DD date
        #[arg(long, default_value = "2008-01-01")]
        after_date: String,
        /// Number of activities to fetch per request (1-100)
        #[arg(long, default_value_t = 100)]
        page_size: u32,
        /// Sort order passed to the Fitbit API
        #[arg(long, default_value = "desc", value_parser = ["asc", "desc"])]
        sort: String,
    },
    /// Download TCX exports for dumped activities with tcx_link fields
    DownloadTcx {
        /// Path to the OAuth tokens file
        #[arg(long)]
        token_file: Option<PathBuf>,
        /// Directory containing YYYY/MM.json activity dumps
        #[arg(long, default_value = "data/fitbit_activities")]
        activities_dir: PathBuf,
        /// Directory where TCX files are stored (default: same as --activities-dir)
        #[arg(long, short = 'o')]
        output_dir: Option<PathBuf>,
        /// Path where the download plan is stored
        #[arg(long, default_value = "data/tcx-files.json")]
        plan_file: PathBuf,
        /// Resume downloads using an existing plan file instead of scanning
        #[arg(long)]
        resume_from: Option<PathBuf>,
        /// List eligible TCX URLs without downloading them
        #[arg(long)]
        dry_run: bool,
    },
    /// Convert TCX workout files to KML format
    TcxToKml {
        /// Input TCX file to convert
        #[arg(long = "in", conflicts_with = "input_dir")]
        input: Option<PathBuf>,
        /// Output KML file (optional for single file mode)
        #[arg(long = "out")]
        output: Option<PathBuf>,
        /// Input directory containing TCX files
        #[arg(long = "in-dir", requires = "output_dir")]
        input_dir: Option<PathBuf>,
        /// Output directory for KML files
        #[arg(long = "out-dir")]
        output_dir: Option<PathBuf>,
        /// Overwrite existing output files
        #[arg(long)]
        overwrite_destination: bool,
        /// Disable statistics output in directory mode
        #[arg(long)]
        no_stats: bool,
    },
    /// Merge multiple KML files into a single document
    MergeKml {
        /// Directory containing .kml files (scanned recursively)
        #[arg(long = "in-dir")]
        input_dir: PathBuf,
        /// Path to the merged KML file (defaults to MERGED.kml inside --in-dir)
        #[arg(long = "out")]
        output: Option<PathBuf>,
        /// Allow replacing an existing output file
        #[arg(long)]
        overwrite: bool,
        /// Parse everything but do not write output
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let config = Config::from_env();

    match run(cli.command, &config).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &Config) -> anyhow::Result<ExitCode> {
    match command {
        Command::DumpActivities {
            token_file,
            output_dir,
            after_date,
            page_size,
            sort,
        } => {
            run_dump_activities(config, token_file, output_dir, after_date, page_size, sort).await
        }
        Command::DownloadTcx {
            token_file,
            activities_dir,
            output_dir,
            plan_file,
            resume_from,
            dry_run,
        } => {
            run_download_tcx(
                config,
                token_file,
                activities_dir,
                output_dir,
                plan_file,
                resume_from,
                dry_run,
            )
            .await
        }
        Command::TcxToKml {
            input,
            output,
            input_dir,
            output_dir,
            overwrite_destination,
            no_stats,
        } => run_tcx_to_kml(input, output, input_dir, output_dir, overwrite_destination, no_stats),
        Command::MergeKml {
            input_dir,
            output,
            overwrite,
            dry_run,
        } => run_merge_kml(input_dir, output, overwrite, dry_run),
    }
}

async fn run_dump_activities(
    config: &Config,
    token_file: Option<PathBuf>,
    output_dir: PathBuf,
    after_date: String,
    page_size: u32,
    sort: String,
) -> anyhow::Result<ExitCode> {
    let token_file = token_file.unwrap_or_else(|| config.token_file.clone());
    tracing::info!(path = %token_file.display(), "Loading tokens");

    let client = FitbitClient::new(&token_file, config)?;
    let mut fetcher = ActivityFetcher::new(client);

    let activities = fetcher.fetch_all(&after_date, page_size, &sort).await?;
    let (buckets, skipped) = bucket_activities_by_month(activities);
    let written = write_month_buckets(&buckets, &output_dir)?;

    let total: usize = buckets.values().map(Vec::len).sum();
    tracing::info!(
        total,
        requests = fetcher.last_request_count(),
        months = written.len(),
        skipped,
        output = %output_dir.display(),
        "Activity dump complete"
    );
    Ok(ExitCode::SUCCESS)
}

async fn run_download_tcx(
    config: &Config,
    token_file: Option<PathBuf>,
    activities_dir: PathBuf,
    output_dir: Option<PathBuf>,
    plan_file: PathBuf,
    resume_from: Option<PathBuf>,
    dry_run: bool,
) -> anyhow::Result<ExitCode> {
    let token_file = token_file.unwrap_or_else(|| config.token_file.clone());
    let mut downloader = TcxDownloader::new(FitbitClient::new(&token_file, config)?);

    let plan_path = match resume_from {
        Some(path) => {
            if !path.exists() {
                tracing::error!(path = %path.display(), "Plan file missing");
                return Ok(ExitCode::FAILURE);
            }
            path
        }
        None => plan_file,
    };

    let mut plan: Vec<DownloadItem> = if plan_path.exists() {
        let loaded = load_plan(&plan_path)?;
        tracing::info!(
            path = %plan_path.display(),
            entries = loaded.len(),
            "Download plan loaded"
        );
        if loaded.is_empty() {
            tracing::info!(path = %plan_path.display(), "Download plan is empty");
        } else {
            let stats = summarize_plan_progress(&loaded);
            tracing::info!(
                total = stats.total_items,
                on_disk = stats.on_disk,
                remaining = stats.remaining(),
                "Resuming download plan"
            );
        }
        loaded
    } else {
        if !activities_dir.exists() {
            tracing::error!(path = %activities_dir.display(), "Activities directory missing");
            return Ok(ExitCode::FAILURE);
        }
        let collected = collect_plan(&activities_dir, output_dir.as_deref())?;
        save_plan(&collected, &plan_path)?;
        tracing::info!(
            path = %plan_path.display(),
            entries = collected.len(),
            "Download plan created"
        );
        collected
    };

    if dry_run {
        let summary = downloader.download_plan(&mut plan, None, true).await?;
        tracing::info!(
            total = summary.total_items,
            pending = summary.dry_run_listed,
            already_downloaded = summary.already_downloaded,
            "Download plan ready"
        );
        return Ok(ExitCode::SUCCESS);
    }

    let summary = downloader
        .download_plan(&mut plan, Some(&plan_path), false)
        .await?;
    tracing::info!(
        total = summary.total_items,
        downloaded = summary.downloaded,
        already_downloaded = summary.already_downloaded,
        failed = summary.failed,
        plan = %plan_path.display(),
        "TCX download summary"
    );
    Ok(ExitCode::SUCCESS)
}

fn run_tcx_to_kml(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    overwrite: bool,
    no_stats: bool,
) -> anyhow::Result<ExitCode> {
    if let Some(input_dir) = input_dir {
        let output_dir = output_dir
            .ok_or_else(|| AppError::BadRequest("--out-dir is required with --in-dir".into()))?;
        if !input_dir.is_dir() {
            tracing::error!(path = %input_dir.display(), "Input directory does not exist");
            return Ok(ExitCode::FAILURE);
        }

        let stats = convert_directory(&input_dir, &output_dir, overwrite)?;
        if !no_stats {
            print_conversion_stats(&stats);
        }
        return Ok(if stats.successful > 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let Some(input) = input else {
        return Err(AppError::BadRequest("Must specify either --in or --in-dir".into()).into());
    };
    if !input.is_file() {
        tracing::error!(path = %input.display(), "Input file does not exist");
        return Ok(ExitCode::FAILURE);
    }

    let output = output.unwrap_or_else(|| input.with_extension("kml"));
    match convert_file(&input, &output, overwrite) {
        Ok(outcome) => {
            println!("Converted {} -> {}", input.display(), output.display());
            println!("  Points: {}, Laps: {}", outcome.points, outcome.laps);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("Failed to convert {}: {}", input.display(), err);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_conversion_stats(stats: &fitbit_to_kml::convert::ConversionStats) {
    println!("Conversion statistics");
    println!("  Total files processed: {}", stats.total_files);
    println!("  Successful conversions: {}", stats.successful);
    println!("  Failed conversions: {}", stats.failed);
    println!("  Total GPS points: {}", stats.total_points);
    println!("  Total laps: {}", stats.total_laps);
}

fn run_merge_kml(
    input_dir: PathBuf,
    output: Option<PathBuf>,
    overwrite: bool,
    dry_run: bool,
) -> anyhow::Result<ExitCode> {
    if !input_dir.is_dir() {
        tracing::error!(path = %input_dir.display(), "Input directory does not exist");
        return Ok(ExitCode::FAILURE);
    }
    let output = output.unwrap_or_else(|| input_dir.join("MERGED.kml"));

    let result = merge_kml_files(&input_dir, &output, overwrite, dry_run)?;
    if dry_run {
        println!(
            "[dry-run] Would merge {} files ({} tracks, {} points) into {}",
            result.stats.files,
            result.stats.placemarks,
            result.stats.points,
            output.display()
        );
        for path in &result.merged_files {
            println!("  - {}", format_relative(path, &input_dir));
        }
    } else {
        println!(
            "Merged {} files into {}\n  Placemarks: {}\n  Points: {}",
            result.stats.files,
            output.display(),
            result.stats.placemarks,
            result.stats.points
        );
    }

    if !result.skipped_files.is_empty() {
        let skipped: Vec<String> = result
            .skipped_files
            .iter()
            .map(|path| format_relative(path, &input_dir))
            .collect();
        println!(
            "Skipped {} files without LineStrings: {}",
            skipped.len(),
            skipped.join(", ")
        );
    }

    Ok(ExitCode::SUCCESS)
}

fn format_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Initialize structured logging with an env-filter override.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fitbit_to_kml=info".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
