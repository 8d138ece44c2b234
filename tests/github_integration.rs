//! Check-run back-link lookups against a mocked GitHub REST API.

use httpmock::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;

use cypress_report::config::{GithubSettings, Secret};
use cypress_report::notify::{GithubClient, NotifyError, resolve_back_link};

fn settings(server: &MockServer) -> GithubSettings {
    GithubSettings {
        token: Some(Secret::new("ghs_test")),
        api_url: server.base_url(),
        server_url: "https://github.example.com/".to_string(),
        repository: Some("acme/shop".to_string()),
        run_id: Some(31),
        job: Some("cypress".to_string()),
        output_file: None,
    }
}

#[tokio::test]
async fn test_check_suite_falls_back_to_suite_url() {
    let server = MockServer::start_async().await;
    let run = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/acme/shop/actions/runs/31")
                .header("authorization", "Bearer ghs_test");
            then.status(200).json_body(json!({
                "id": 31,
                "check_suite_url": "https://api.github.com/repos/acme/shop/check-suites/5150"
            }));
        })
        .await;

    let client = GithubClient::new(&settings(&server)).unwrap();
    let suite = client.check_suite_id("acme", "shop", 31).await.unwrap();

    run.assert_async().await;
    assert_eq!(suite, 5150);
}

#[tokio::test]
async fn test_missing_check_suite_is_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/acme/shop/actions/runs/31");
            then.status(200).json_body(json!({"id": 31}));
        })
        .await;

    let client = GithubClient::new(&settings(&server)).unwrap();
    let err = client.check_suite_id("acme", "shop", 31).await.unwrap_err();
    assert!(matches!(err, NotifyError::MissingCheckSuite { run_id: 31 }), "got {err:?}");
}

#[tokio::test]
async fn test_back_link_uses_last_matching_check_run() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/acme/shop/actions/runs/31");
            then.status(200).json_body(json!({"check_suite_id": 8}));
        })
        .await;
    let runs = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/repos/acme/shop/check-suites/8/check-runs")
                .query_param("check_name", "cypress");
            then.status(200).json_body(json!({
                "total_count": 3,
                "check_runs": [{"id": 1}, {"id": 2}, {"id": 3}]
            }));
        })
        .await;

    let link = resolve_back_link(&settings(&server)).await;

    runs.assert_async().await;
    assert_eq!(
        link.as_deref(),
        Some("https://github.example.com/acme/shop/runs/3?check_suite_focus=true")
    );
}

#[tokio::test]
async fn test_back_link_is_none_without_matching_runs() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/acme/shop/actions/runs/31");
            then.status(200).json_body(json!({"check_suite_id": 8}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/acme/shop/check-suites/8/check-runs");
            then.status(200).json_body(json!({"total_count": 0, "check_runs": []}));
        })
        .await;

    assert_eq!(resolve_back_link(&settings(&server)).await, None);
}

#[tokio::test]
async fn test_back_link_skips_lookup_without_run_context() {
    let server = MockServer::start_async().await;
    let mut settings = settings(&server);
    settings.run_id = None;

    assert_eq!(resolve_back_link(&settings).await, None);

    settings.run_id = Some(31);
    settings.repository = Some("not-a-repo".to_string());
    assert_eq!(resolve_back_link(&settings).await, None);
}

#[tokio::test]
async fn test_lookup_error_carries_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/repos/acme/shop/actions/runs/31");
            then.status(403).body("rate limited");
        })
        .await;

    let client = GithubClient::new(&settings(&server)).unwrap();
    let err = client.resolve_check_run("acme", "shop", 31, "cypress").await.unwrap_err();
    match err {
        NotifyError::Lookup { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "rate limited");
        }
        other => panic!("expected a lookup error, got {other:?}"),
    }
}
