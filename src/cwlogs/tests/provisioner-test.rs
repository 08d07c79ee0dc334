mod common;

use common::FakeLogs;
use cwlogs::cloud_providers::logs::LogsError;
use cwlogs::shipper::{ensure_ready, ProvisionError};

#[tokio::test]
async fn test_creates_missing_group_and_stream() {
    let api = FakeLogs::new();

    let token = ensure_ready(&api, "app", "web-1").await.unwrap();

    assert_eq!(token, None);
    assert!(api.has_stream("app", "web-1"));
    assert_eq!(api.create_group_calls(), 1);
    assert_eq!(api.create_stream_calls(), 1);
}

#[tokio::test]
async fn test_second_call_creates_nothing() {
    let api = FakeLogs::new();

    ensure_ready(&api, "app", "web-1").await.unwrap();
    ensure_ready(&api, "app", "web-1").await.unwrap();

    assert_eq!(api.create_group_calls(), 1);
    assert_eq!(api.create_stream_calls(), 1);
}

#[tokio::test]
async fn test_existing_destination_returns_stream_token() {
    let api = FakeLogs::new().with_stream("app", "web-1", Some("token-9"));

    let token = ensure_ready(&api, "app", "web-1").await.unwrap();

    assert_eq!(token.as_deref(), Some("token-9"));
    assert_eq!(api.create_group_calls(), 0);
    assert_eq!(api.create_stream_calls(), 0);
}

#[tokio::test]
async fn test_prefix_matches_are_not_exact_matches() {
    let api = FakeLogs::new().with_stream("app-old", "web-1-old", None);

    ensure_ready(&api, "app", "web-1").await.unwrap();
    assert_eq!(api.create_group_calls(), 1);

    let api = FakeLogs::new().with_stream("app", "web-1-old", Some("token-3"));
    let token = ensure_ready(&api, "app", "web-1").await.unwrap();

    assert_eq!(token, None);
    assert_eq!(api.create_stream_calls(), 1);
    assert!(api.has_stream("app", "web-1"));
}

#[tokio::test]
async fn test_lost_creation_race_is_tolerated() {
    let api = FakeLogs::new().with_concurrent_creator();

    let token = ensure_ready(&api, "app", "web-1").await.unwrap();

    assert_eq!(token, None);
    assert!(api.has_stream("app", "web-1"));
}

#[tokio::test]
async fn test_stream_creation_failure_is_reported() {
    let api = FakeLogs::new().with_group("app");
    api.fail_create_stream(LogsError::service(
        "CreateLogStream",
        "AccessDeniedException",
    ));

    let err = ensure_ready(&api, "app", "web-1").await.unwrap_err();

    assert!(matches!(err, ProvisionError::CreateStream { .. }));
    let message = err.to_string();
    assert!(message.contains("web-1"));
    assert!(message.contains("AccessDeniedException"));
}
