// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Plan collection, persistence, and resumable download tests.

mod common;

use common::{test_config, write_file, write_token_json, TempDir};
use fitbit_to_kml::error::AppError;
use fitbit_to_kml::models::DownloadItem;
use fitbit_to_kml::services::tcx::{
    collect_plan, load_plan, save_plan, summarize_plan_progress,
};
use fitbit_to_kml::services::{FitbitClient, TcxDownloader};
use serde_json::json;
use std::fs;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_downloader(dir: &TempDir) -> TcxDownloader {
    let token_file = write_token_json(dir, &json!({"access_token": "token-abc"}));
    TcxDownloader::new(FitbitClient::new(&token_file, &test_config()).expect("client"))
}

#[test]
fn test_collect_plan_filters_and_names_destinations() {
    let dir = TempDir::new("plan-collect");
    let activities_dir = dir.join("activities");
    let output_dir = dir.join("tcx");

    write_file(
        &activities_dir.join("2024/02.json"),
        &json!([
            {"logId": 1, "distance": 5.2, "hasGps": true,
             "tcx_link": "https://api.fitbit.com/1/user/-/activities/111.tcx"},
            // duplicate URL, first occurrence wins
            {"logId": 2, "distance": 3.0, "hasGps": true,
             "tcx_link": "https://api.fitbit.com/1/user/-/activities/111.tcx"},
            // filtered: zero distance
            {"logId": 3, "distance": 0, "hasGps": true,
             "tcx_link": "https://api.fitbit.com/1/user/-/activities/222.tcx"},
            // filtered: no GPS
            {"logId": 4, "distance": 2.0, "hasGps": false,
             "tcx_link": "https://api.fitbit.com/1/user/-/activities/333.tcx"},
            // filtered: no link
            {"logId": 5, "distance": 2.0, "hasGps": true},
            // filtered: link without a .tcx suffix
            {"logId": 6, "distance": 2.0, "hasGps": true,
             "tcx_link": "https://api.fitbit.com/1/user/-/activities/444"}
        ])
        .to_string(),
    );
    write_file(
        &activities_dir.join("2023/12.json"),
        &json!({"activities": [
            {"logId": 7, "distance": "8.1", "hasGps": "true",
             "tcxLink": "https://api.fitbit.com/1/user/-/activities/555.tcx"}
        ]})
        .to_string(),
    );
    // skipped: path does not encode year/month
    write_file(&activities_dir.join("notes.json"), "[]");

    let plan = collect_plan(&activities_dir, Some(&output_dir)).expect("collect");
    assert_eq!(plan.len(), 2);

    // files are scanned in sorted order, so 2023 comes first
    assert_eq!(
        plan[0].url,
        "https://api.fitbit.com/1/user/-/activities/555.tcx"
    );
    assert!(plan[0].path.ends_with("2023/12_555.tcx"));
    assert_eq!(
        plan[1].url,
        "https://api.fitbit.com/1/user/-/activities/111.tcx"
    );
    assert!(plan[1].path.ends_with("2024/02_111.tcx"));
    assert!(plan.iter().all(|item| !item.downloaded));
}

#[test]
fn test_collect_plan_uses_camel_case_link_when_snake_case_is_null() {
    let dir = TempDir::new("plan-link-fallback");
    let activities_dir = dir.join("activities");

    write_file(
        &activities_dir.join("2024/05.json"),
        &json!([
            {"logId": 1, "distance": 5.0, "hasGps": true,
             "tcx_link": null,
             "tcxLink": "https://api.fitbit.com/1/user/-/activities/111.tcx"}
        ])
        .to_string(),
    );

    let plan = collect_plan(&activities_dir, Some(&dir.join("tcx"))).expect("collect");
    assert_eq!(plan.len(), 1);
    assert_eq!(
        plan[0].url,
        "https://api.fitbit.com/1/user/-/activities/111.tcx"
    );
}

#[test]
fn test_collect_plan_marks_existing_files_downloaded() {
    let dir = TempDir::new("plan-preset");
    let activities_dir = dir.join("activities");
    let output_dir = dir.join("tcx");

    write_file(
        &activities_dir.join("2024/02.json"),
        &json!([
            {"logId": 1, "distance": 5.2, "hasGps": true,
             "tcx_link": "https://api.fitbit.com/1/user/-/activities/111.tcx"}
        ])
        .to_string(),
    );
    write_file(&output_dir.join("2024/02_111.tcx"), "<xml/>");

    let plan = collect_plan(&activities_dir, Some(&output_dir)).expect("collect");
    assert_eq!(plan.len(), 1);
    assert!(plan[0].downloaded);
}

#[test]
fn test_collect_plan_defaults_output_to_activities_dir() {
    let dir = TempDir::new("plan-default-out");
    let activities_dir = dir.join("activities");
    write_file(
        &activities_dir.join("2024/02.json"),
        &json!([
            {"logId": 1, "distance": 5.2, "hasGps": true,
             "tcx_link": "https://api.fitbit.com/1/user/-/activities/111.tcx"}
        ])
        .to_string(),
    );

    let plan = collect_plan(&activities_dir, None).expect("collect");
    assert_eq!(plan.len(), 1);
    assert!(plan[0]
        .path
        .starts_with(&activities_dir.to_string_lossy().into_owned()));
}

#[test]
fn test_save_and_load_plan_round_trip() {
    let dir = TempDir::new("plan-round-trip");
    let plan_path = dir.join("plan.json");
    let plan = vec![
        DownloadItem {
            url: "https://example.com/a.tcx".to_string(),
            path: "out/a.tcx".to_string(),
            downloaded: true,
        },
        DownloadItem {
            url: "https://example.com/b.tcx".to_string(),
            path: "out/b.tcx".to_string(),
            downloaded: false,
        },
    ];

    save_plan(&plan, &plan_path).expect("save");
    let loaded = load_plan(&plan_path).expect("load");
    assert_eq!(loaded, plan);

    let stats = summarize_plan_progress(&loaded);
    assert_eq!(stats.total_items, 2);
    assert_eq!(stats.on_disk, 1);
    assert_eq!(stats.remaining(), 1);
}

#[test]
fn test_load_plan_rejects_non_array_document() {
    let dir = TempDir::new("plan-bad-shape");
    let plan_path = dir.join("plan.json");
    write_file(&plan_path, "{\"items\": []}");
    let err = load_plan(&plan_path).unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_download_plan_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/111.tcx"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<TrainingCenterDatabase/>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new("plan-idempotent");
    let mut downloader = test_downloader(&dir);
    let dest = dir.join("out/2024/02_111.tcx");
    let mut plan = vec![DownloadItem {
        url: format!("{}/files/111.tcx", server.uri()),
        path: dest.to_string_lossy().into_owned(),
        downloaded: false,
    }];

    let summary = downloader
        .download_plan(&mut plan, None, false)
        .await
        .expect("first run");
    assert_eq!(summary.downloaded, 1);
    assert_eq!(
        fs::read_to_string(&dest).expect("downloaded file"),
        "<TrainingCenterDatabase/>"
    );

    // Second run performs no network calls at all.
    let summary = downloader
        .download_plan(&mut plan, None, false)
        .await
        .expect("second run");
    assert_eq!(summary.downloaded, 0);
    assert_eq!(summary.already_downloaded, 1);
}

#[tokio::test]
async fn test_dry_run_makes_no_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new("plan-dry-run");
    let mut downloader = test_downloader(&dir);
    let mut plan = vec![
        DownloadItem {
            url: format!("{}/files/111.tcx", server.uri()),
            path: dir.join("out/111.tcx").to_string_lossy().into_owned(),
            downloaded: false,
        },
        DownloadItem {
            url: format!("{}/files/222.tcx", server.uri()),
            path: dir.join("out/222.tcx").to_string_lossy().into_owned(),
            downloaded: true,
        },
    ];

    let summary = downloader
        .download_plan(&mut plan, None, true)
        .await
        .expect("dry run");
    assert_eq!(summary.total_items, 2);
    assert_eq!(summary.dry_run_listed, 1);
    assert_eq!(summary.already_downloaded, 1);
    assert!(!dir.join("out/111.tcx").exists());
}

#[tokio::test]
async fn test_api_failure_is_counted_and_run_continues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/missing.tcx"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/222.tcx"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new("plan-failures");
    let mut downloader = test_downloader(&dir);
    let dest = dir.join("out/222.tcx");
    let mut plan = vec![
        DownloadItem {
            url: format!("{}/files/missing.tcx", server.uri()),
            path: dir.join("out/missing.tcx").to_string_lossy().into_owned(),
            downloaded: false,
        },
        DownloadItem {
            url: format!("{}/files/222.tcx", server.uri()),
            path: dest.to_string_lossy().into_owned(),
            downloaded: false,
        },
    ];

    let summary = downloader
        .download_plan(&mut plan, None, false)
        .await
        .expect("run");
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.downloaded, 1);
    assert!(!plan[0].downloaded);
    assert!(plan[1].downloaded);
    assert!(dest.is_file());
}

#[tokio::test]
async fn test_plan_checkpoint_survives_a_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/111.tcx"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new("plan-checkpoint");
    let mut downloader = test_downloader(&dir);
    let plan_path = dir.join("plan.json");
    let mut plan = vec![
        DownloadItem {
            url: format!("{}/files/111.tcx", server.uri()),
            path: dir.join("out/111.tcx").to_string_lossy().into_owned(),
            downloaded: false,
        },
        // unroutable address: the transport error aborts the run
        DownloadItem {
            url: "http://127.0.0.1:1/files/222.tcx".to_string(),
            path: dir.join("out/222.tcx").to_string_lossy().into_owned(),
            downloaded: false,
        },
    ];
    save_plan(&plan, &plan_path).expect("seed plan");

    let err = downloader
        .download_plan(&mut plan, Some(&plan_path), false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Http(_)));

    // The checkpoint written after the first item records its completion.
    let reloaded = load_plan(&plan_path).expect("reload plan");
    assert!(reloaded[0].downloaded);
    assert!(!reloaded[1].downloaded);
}
