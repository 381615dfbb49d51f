// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

mod common;

use common::{test_config, write_token_json, TempDir};
use fitbit_to_kml::error::AppError;
use fitbit_to_kml::services::{ActivityFetcher, FitbitClient};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_fetcher(dir: &TempDir, base: &str) -> ActivityFetcher {
    let token_file = write_token_json(dir, &json!({"access_token": "token-abc"}));
    let client = FitbitClient::new(&token_file, &test_config()).expect("client");
    ActivityFetcher::new(client).with_api_base(base)
}

#[tokio::test]
async fn test_page_size_out_of_range_is_rejected_before_any_request() {
    let dir = TempDir::new("fetcher-bounds");
    let mut fetcher = test_fetcher(&dir, "http://127.0.0.1:1");

    for page_size in [0, 101] {
        let err = fetcher
            .fetch_all("2008-01-01", page_size, "desc")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}

#[tokio::test]
async fn test_single_page_fetch_sends_expected_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/user/-/activities/list.json"))
        .and(query_param("afterDate", "2008-01-01"))
        .and(query_param("sort", "desc"))
        .and(query_param("limit", "50"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "activities": [{"logId": 1}],
            "pagination": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new("fetcher-query");
    let mut fetcher = test_fetcher(&dir, &server.uri());

    let activities = fetcher.fetch_all("2008-01-01", 50, "desc").await.expect("fetch");
    assert_eq!(activities.len(), 1);
    assert_eq!(fetcher.last_request_count(), 1);
}

#[tokio::test]
async fn test_pagination_follows_absolute_next_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/user/-/activities/list.json"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "activities": [{"logId": 1}, {"logId": 2}],
            "pagination": {
                "next": format!(
                    "{}/1/user/-/activities/list.json?offset=2&limit=2",
                    server.uri()
                )
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/user/-/activities/list.json"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "activities": [{"logId": 3}],
            "pagination": {"next": ""}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new("fetcher-pages");
    let mut fetcher = test_fetcher(&dir, &server.uri());

    let activities = fetcher.fetch_all("2008-01-01", 2, "desc").await.expect("fetch");
    assert_eq!(activities.len(), 3);
    assert_eq!(activities[2]["logId"], 3);
    assert_eq!(fetcher.last_request_count(), 2);
}

#[tokio::test]
async fn test_pagination_follows_relative_next_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/user/-/activities/list.json"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "activities": [{"logId": 1}],
            "pagination": {"next": "/1/user/-/activities/list.json?offset=1&limit=1"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/1/user/-/activities/list.json"))
        .and(query_param("offset", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "activities": [{"logId": 2}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new("fetcher-relative");
    let mut fetcher = test_fetcher(&dir, &server.uri());

    let activities = fetcher.fetch_all("2008-01-01", 1, "asc").await.expect("fetch");
    assert_eq!(activities.len(), 2);
}

#[tokio::test]
async fn test_missing_activities_field_yields_empty_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/1/user/-/activities/list.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new("fetcher-empty");
    let mut fetcher = test_fetcher(&dir, &server.uri());

    let activities = fetcher.fetch_all("2008-01-01", 100, "desc").await.expect("fetch");
    assert!(activities.is_empty());
}
