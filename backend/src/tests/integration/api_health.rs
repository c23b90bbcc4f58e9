use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::tests::fixtures::*;
use crate::tests::helpers::{get, recorder, test_app, test_app_with_recorder};

fn healthy_app() -> (axum::Router, DependencySet, Arc<RecordingSink>) {
    let deps = DependencySet::healthy();
    let sink = Arc::new(RecordingSink::default());
    (test_app(&deps, sink.clone()), deps, sink)
}

#[tokio::test]
async fn test_basic_health_endpoint() {
    let (app, _deps, _) = healthy_app();

    for uri in ["/health", "/health/"] {
        let (status, _, body) = get(app.clone(), uri).await;

        assert_eq!(status, StatusCode::OK, "{}", uri);
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }
}

#[tokio::test]
async fn test_liveness_endpoint_with_everything_down() {
    let deps = DependencySet::all_down();
    let app = test_app(&deps, Arc::new(RecordingSink::default()));

    let (status, _, body) = get(app, "/health/live").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alive"], json!(true));
    assert_eq!(deps.database.ping_count(), 0);
}

#[tokio::test]
async fn test_readiness_endpoint() {
    let (app, _deps, _) = healthy_app();
    let (status, _, body) = get(app, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], json!(true));

    let deps = DependencySet::all_down();
    let app = test_app(&deps, Arc::new(RecordingSink::default()));
    let (status, _, body) = get(app, "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], json!(false));
}

#[tokio::test]
async fn test_detailed_endpoint_all_healthy() {
    let (app, deps, sink) = healthy_app();

    let (status, _, body) = get(app, "/health/detailed").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    for check in ["database", "cache", "storage", "queue"] {
        assert_eq!(body["checks"][check]["healthy"], json!(true), "{}", check);
    }
    assert_eq!(body["checks"]["cache"]["detail"]["driver"], "array");
    assert_eq!(body["application"]["name"], "Vitals Test");
    assert_eq!(body["application"]["version"], "9.9.9");

    assert_eq!(deps.storage.object_count(), 0);
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn test_detailed_endpoint_reports_failures() {
    let deps = DependencySet {
        cache: Arc::new(FlakyCache {
            fail_get: true,
            ..FlakyCache::default()
        }),
        ..DependencySet::healthy()
    };
    let sink = Arc::new(RecordingSink::default());
    let app = test_app(&deps, sink.clone());

    let (status, _, body) = get(app, "/health/detailed").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["checks"]["cache"]["healthy"], json!(false));
    assert_eq!(body["checks"]["cache"]["message"], "Cache system failed");
    assert!(body["checks"]["cache"]["error"].is_string());
    assert_eq!(body["checks"]["database"]["healthy"], json!(true));
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn test_unhealthy_polls_write_no_activity_records() {
    let deps = DependencySet {
        queue_connection: None,
        ..DependencySet::healthy()
    };
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(RecordingStore::default());
    let app = test_app_with_recorder(&deps, recorder(sink.clone()).with_store(store.clone()));

    for _ in 0..3 {
        let (status, _, _) = get(app.clone(), "/health/detailed").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    assert!(store.records().is_empty());
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn test_detailed_does_not_wait_on_activity_store() {
    let deps = DependencySet {
        queue_connection: None,
        ..DependencySet::healthy()
    };
    let app = test_app_with_recorder(
        &deps,
        recorder(Arc::new(RecordingSink::default())).with_store(Arc::new(StallingStore)),
    );

    let response = tokio::time::timeout(Duration::from_secs(5), get(app, "/health/detailed")).await;

    let (status, _, body) = response.expect("detailed health waited on the activity store");
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["checks"]["queue"]["healthy"], json!(false));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _deps, _) = healthy_app();

    let (status, _, body) = get(app, "/health/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["timestamp"].is_string());
    assert!(body["system"]["memory_usage_mb"].is_number());
    assert!(body["system"]["memory_peak_mb"].is_number());
    assert_eq!(body["application"]["name"], "Vitals Test");
    assert_eq!(body["application"]["debug_mode"], json!(true));
    assert_eq!(body["application"]["timezone"], "Europe/Berlin");
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let (app, _deps, _) = healthy_app();

    for uri in ["/health", "/health/detailed", "/does-not-exist"] {
        let (_, headers, _) = get(app.clone(), uri).await;

        assert_eq!(headers["x-frame-options"], "SAMEORIGIN", "{}", uri);
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-xss-protection"], "1; mode=block");
        assert!(headers.contains_key("content-security-policy"));
        assert!(headers.contains_key("strict-transport-security"));
        assert!(headers.contains_key("referrer-policy"));
        assert!(headers.contains_key("permissions-policy"));
        assert!(!headers.contains_key("x-powered-by"));
        assert!(headers.contains_key("x-request-id"));
    }
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let (app, _deps, _) = healthy_app();

    let (status, _, body) = get(app, "/health/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["path"], "/health/nope");
}
