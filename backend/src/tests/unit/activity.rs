use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::Request;
use rust_decimal::Decimal;
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use vitals_shared::{Actor, LogLevel, RequestInfo};

use crate::services::{ActivityContext, Metadata, TrustedProxies};
use crate::tests::fixtures::*;
use crate::tests::helpers::{aggregator, init_test_logging, recorder};
use crate::AppState;

const CHROME_ON_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn signed_in() -> ActivityContext {
    ActivityContext {
        actor: Some(Actor {
            id: "42".to_string(),
            identifier: "finance@example.com".to_string(),
            kind: "user".to_string(),
        }),
        request: RequestInfo {
            ip: Some("203.0.113.9".to_string()),
            user_agent: Some(CHROME_ON_WINDOWS.to_string()),
            method: "POST".to_string(),
            url: "https://vitals.example.com/api/v1/payments".to_string(),
            route: Some("/api/v1/payments".to_string()),
        },
        session_id: Some("sess-1".to_string()),
    }
}

fn metadata(value: serde_json::Value) -> Metadata {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn test_log_activity_builds_full_record() {
    let sink = Arc::new(RecordingSink::default());
    let logger = recorder(sink.clone());

    logger
        .log_activity(
            &signed_in(),
            "USER_LOGIN",
            "User signed in",
            metadata(json!({ "mfa": true })),
            "notice",
        )
        .await;

    let (level, message, record) = sink.last();
    assert_eq!(level, LogLevel::Notice);
    assert_eq!(message, "Activity Log: USER_LOGIN");
    assert_eq!(record.action, "USER_LOGIN");
    assert_eq!(record.description, "User signed in");
    assert_eq!(record.level, LogLevel::Notice);
    assert_eq!(record.actor.unwrap().identifier, "finance@example.com");
    assert_eq!(record.request.ip.as_deref(), Some("203.0.113.9"));
    assert_eq!(record.request.route.as_deref(), Some("/api/v1/payments"));
    assert_eq!(record.session_id.as_deref(), Some("sess-1"));
    assert_eq!(record.device.platform, "Windows");
    assert_eq!(record.device.browser, "Chrome");
    assert!(record.device.is_desktop);
    assert_eq!(record.metadata["mfa"], json!(true));
    assert_eq!(record.metadata["application"], json!("Vitals Test"));
    assert_eq!(record.metadata["environment"], json!("testing"));
}

#[tokio::test]
async fn test_every_level_is_routed_to_itself() {
    let sink = Arc::new(RecordingSink::default());
    let logger = recorder(sink.clone());

    for level in LogLevel::ALL {
        logger
            .log_activity(&signed_in(), "PING", "", Metadata::new(), level.as_str())
            .await;
        assert_eq!(sink.last().0, level);
    }
    assert_eq!(sink.events().len(), LogLevel::ALL.len());
}

#[tokio::test]
async fn test_unknown_level_falls_back_to_info() {
    init_test_logging();
    let sink = Arc::new(RecordingSink::default());
    let logger = recorder(sink.clone());

    logger
        .log_activity(&signed_in(), "PING", "", Metadata::new(), "verbose")
        .await;

    let (level, _, record) = sink.last();
    assert_eq!(level, LogLevel::Info);
    assert_eq!(record.level, LogLevel::Info);
}

#[tokio::test]
async fn test_anonymous_request_has_null_actor() {
    let sink = Arc::new(RecordingSink::default());
    let logger = recorder(sink.clone());

    logger
        .log_activity(
            &ActivityContext::default(),
            "PUBLIC_PAGE_VIEW",
            "Landing page",
            Metadata::new(),
            "info",
        )
        .await;

    let (_, _, record) = sink.last();
    let serialized = serde_json::to_value(&record).unwrap();
    assert_eq!(serialized["actor"], json!(null));
    assert_eq!(record.device.device, "unknown");
    assert!(!record.device.is_mobile);
    assert!(!record.device.is_desktop);
}

#[tokio::test]
async fn test_caller_metadata_wins_over_base_fields() {
    let sink = Arc::new(RecordingSink::default());
    let logger = recorder(sink.clone());

    logger
        .log_activity(
            &signed_in(),
            "MIGRATION",
            "",
            metadata(json!({ "environment": "staging" })),
            "info",
        )
        .await;

    let (_, _, record) = sink.last();
    assert_eq!(record.metadata["environment"], json!("staging"));
    assert_eq!(record.metadata["application"], json!("Vitals Test"));
}

#[tokio::test]
async fn test_security_event() {
    let sink = Arc::new(RecordingSink::default());
    let logger = recorder(sink.clone());

    logger
        .log_security_event(
            &signed_in(),
            "BRUTE_FORCE",
            "Ten failed logins in a minute",
            metadata(json!({ "security_event": false, "attempts": 10 })),
        )
        .await;

    let (level, _, record) = sink.last();
    assert_eq!(level, LogLevel::Warning);
    assert_eq!(record.action, "SECURITY_EVENT: BRUTE_FORCE");
    assert_eq!(record.description, "Ten failed logins in a minute");
    assert_eq!(record.metadata["security_event"], json!(true));
    assert_eq!(record.metadata["attempts"], json!(10));
}

#[tokio::test]
async fn test_financial_transaction_defaults_currency() {
    let sink = Arc::new(RecordingSink::default());
    let logger = recorder(sink.clone());

    logger
        .log_financial_transaction(
            &signed_in(),
            "REFUND",
            Decimal::from_str("12.5").unwrap(),
            Metadata::new(),
        )
        .await;

    let (level, _, record) = sink.last();
    assert_eq!(level, LogLevel::Info);
    assert_eq!(record.action, "FINANCIAL_TRANSACTION: REFUND");
    assert_eq!(record.description, "Transaction of 12.50 executed");
    assert_eq!(record.metadata["transaction_type"], json!("REFUND"));
    assert_eq!(record.metadata["currency"], json!("USD"));
    assert_eq!(record.metadata["amount"], json!(12.5));
}

#[tokio::test]
async fn test_financial_transaction_keeps_caller_currency() {
    let sink = Arc::new(RecordingSink::default());
    let logger = recorder(sink.clone());

    logger
        .log_financial_transaction(
            &signed_in(),
            "PAYMENT",
            Decimal::new(199_99, 2),
            metadata(json!({ "currency": "EUR", "invoice": "INV-7" })),
        )
        .await;

    let (_, _, record) = sink.last();
    assert_eq!(record.description, "Transaction of 199.99 executed");
    assert_eq!(record.metadata["currency"], json!("EUR"));
    assert_eq!(record.metadata["invoice"], json!("INV-7"));
}

#[tokio::test]
async fn test_data_access_defaults_to_view() {
    let sink = Arc::new(RecordingSink::default());
    let logger = recorder(sink.clone());

    logger
        .log_data_access(&signed_in(), "invoice", "42", None)
        .await;

    let (level, _, record) = sink.last();
    assert_eq!(level, LogLevel::Info);
    assert_eq!(record.action, "DATA_ACCESS: VIEW");
    assert_eq!(record.description, "View accessed invoice: 42");
    assert_eq!(record.metadata["resource_type"], json!("invoice"));
    assert_eq!(record.metadata["resource_id"], json!("42"));
    assert_eq!(record.metadata["access_type"], json!("view"));
}

#[tokio::test]
async fn test_data_access_with_explicit_access_type() {
    let sink = Arc::new(RecordingSink::default());
    let logger = recorder(sink.clone());

    logger
        .log_data_access(&signed_in(), "client", "acme", Some("export"))
        .await;

    let (_, _, record) = sink.last();
    assert_eq!(record.action, "DATA_ACCESS: EXPORT");
    assert_eq!(record.description, "Export accessed client: acme");
}

#[tokio::test]
async fn test_admin_action() {
    let sink = Arc::new(RecordingSink::default());
    let logger = recorder(sink.clone());

    logger
        .log_admin_action(
            &signed_in(),
            "ROLE_CHANGE",
            "Promoted user 7 to admin",
            metadata(json!({ "target_user": "7" })),
        )
        .await;

    let (level, _, record) = sink.last();
    assert_eq!(level, LogLevel::Notice);
    assert_eq!(record.action, "ADMIN_ACTION: ROLE_CHANGE");
    assert_eq!(record.metadata["admin_action"], json!(true));
    assert_eq!(record.metadata["target_user"], json!("7"));
}

#[tokio::test]
async fn test_records_are_persisted_when_store_attached() {
    let sink = Arc::new(RecordingSink::default());
    let store = Arc::new(RecordingStore::default());
    let logger = recorder(sink.clone()).with_store(store.clone());

    logger
        .log_admin_action(&signed_in(), "CACHE_FLUSH", "", Metadata::new())
        .await;

    let stored = store.records();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].action, "ADMIN_ACTION: CACHE_FLUSH");
    assert_eq!(sink.events().len(), 1);
}

#[tokio::test]
async fn test_store_failure_is_swallowed() {
    init_test_logging();
    let sink = Arc::new(RecordingSink::default());
    let logger = recorder(sink.clone()).with_store(Arc::new(FailingStore));

    logger
        .log_security_event(&signed_in(), "TOKEN_REUSE", "", Metadata::new())
        .await;

    assert_eq!(sink.last().2.action, "SECURITY_EVENT: TOKEN_REUSE");
}

#[tokio::test]
async fn test_context_extractor_uses_configured_proxies() {
    let deps = DependencySet::healthy();
    let state = Arc::new(AppState {
        health: aggregator(&deps),
        activity: recorder(Arc::new(RecordingSink::default())),
        trusted_proxies: TrustedProxies::new([IpAddr::from([10, 0, 0, 2])]),
    });

    let mut request = Request::builder()
        .uri("/")
        .header("x-forwarded-for", "203.0.113.50")
        .body(())
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 2], 443))));
    let (mut parts, _) = request.into_parts();

    let ctx = ActivityContext::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(ctx.request.ip.as_deref(), Some("203.0.113.50"));
}
