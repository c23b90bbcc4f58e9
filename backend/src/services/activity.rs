//! Structured activity (audit) logging
//!
//! Every call builds one [`ActivityRecord`] from explicit request context,
//! hands it to a severity-leveled sink and, when a durable store is attached,
//! persists a copy. Nothing in here ever fails the calling operation.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts, MatchedPath},
    http::request::Parts,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashSet;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use vitals_shared::{ActivityRecord, Actor, LogLevel, RequestInfo};

use crate::config::AppConfig;
use crate::services::audit::ActivityStore;
use crate::services::device;
use crate::AppState;

pub type Metadata = Map<String, JsonValue>;

/// Peers allowed to set `X-Forwarded-*` / `X-Real-IP`
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies(Arc<HashSet<IpAddr>>);

impl TrustedProxies {
    pub fn new(proxies: impl IntoIterator<Item = IpAddr>) -> Self {
        Self(Arc::new(proxies.into_iter().collect()))
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.0.contains(ip)
    }

    /// Rightmost hop that isn't one of our proxies, else the leftmost hop
    fn client_from_chain(&self, forwarded_for: &str) -> Option<String> {
        let hops: Vec<&str> = forwarded_for
            .split(',')
            .map(str::trim)
            .filter(|hop| !hop.is_empty())
            .collect();

        hops.iter()
            .rev()
            .find(|hop| hop.parse::<IpAddr>().map_or(true, |ip| !self.contains(&ip)))
            .or_else(|| hops.first())
            .map(|hop| hop.to_string())
    }
}

/// Who is acting and through which request
#[derive(Debug, Clone, Default)]
pub struct ActivityContext {
    pub actor: Option<Actor>,
    pub request: RequestInfo,
    pub session_id: Option<String>,
}

impl ActivityContext {
    /// Forwarding headers are only believed when the socket peer is a
    /// trusted proxy; otherwise the peer address is the client.
    pub fn from_parts(parts: &Parts, trusted: &TrustedProxies) -> Self {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(String::from)
        };

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let behind_proxy = peer.is_some_and(|ip| trusted.contains(&ip));

        let forwarded = if behind_proxy {
            header("x-forwarded-for")
                .and_then(|chain| trusted.client_from_chain(&chain))
                .or_else(|| header("x-real-ip"))
        } else {
            None
        };
        let ip = forwarded.or_else(|| peer.map(|ip| ip.to_string()));

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        let url = match (parts.uri.scheme_str(), parts.uri.authority()) {
            (Some(_), Some(_)) => parts.uri.to_string(),
            _ => match header("host") {
                Some(host) => {
                    let scheme = behind_proxy
                        .then(|| header("x-forwarded-proto"))
                        .flatten()
                        .unwrap_or_else(|| "http".to_string());
                    format!("{}://{}{}", scheme, host, path_and_query)
                }
                None => path_and_query,
            },
        };

        Self {
            actor: parts.extensions.get::<Actor>().cloned(),
            request: RequestInfo {
                ip,
                user_agent: header("user-agent"),
                method: parts.method.to_string(),
                url,
                route: parts
                    .extensions
                    .get::<MatchedPath>()
                    .map(|path| path.as_str().to_string()),
            },
            session_id: header("x-session-id"),
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ActivityContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts, &state.trusted_proxies))
    }
}

/// Destination for activity records, one call per record
pub trait ActivitySink: Send + Sync {
    fn emit(&self, level: LogLevel, message: &str, record: &ActivityRecord);
}

type LevelFn = fn(LogLevel, &str, &str);

/// Sink that writes records as `tracing` events.
///
/// tracing has five levels, so the eight audit severities are folded onto
/// them and the original severity is kept in the `severity` field.
pub struct TracingSink;

impl TracingSink {
    fn route(level: LogLevel) -> LevelFn {
        match level {
            LogLevel::Emergency | LogLevel::Alert | LogLevel::Critical | LogLevel::Error => {
                emit_error
            }
            LogLevel::Warning => emit_warn,
            LogLevel::Notice | LogLevel::Info => emit_info,
            LogLevel::Debug => emit_debug,
        }
    }
}

impl ActivitySink for TracingSink {
    fn emit(&self, level: LogLevel, message: &str, record: &ActivityRecord) {
        let payload = serde_json::to_string(record).unwrap_or_else(|e| {
            json!({ "action": record.action, "serialization_error": e.to_string() }).to_string()
        });
        Self::route(level)(level, message, &payload);
    }
}

fn emit_error(level: LogLevel, message: &str, payload: &str) {
    tracing::error!(target: "activity", severity = level.as_str(), activity = %payload, "{}", message);
}

fn emit_warn(level: LogLevel, message: &str, payload: &str) {
    tracing::warn!(target: "activity", severity = level.as_str(), activity = %payload, "{}", message);
}

fn emit_info(level: LogLevel, message: &str, payload: &str) {
    tracing::info!(target: "activity", severity = level.as_str(), activity = %payload, "{}", message);
}

fn emit_debug(level: LogLevel, message: &str, payload: &str) {
    tracing::debug!(target: "activity", severity = level.as_str(), activity = %payload, "{}", message);
}

/// Builds, routes and optionally persists activity records
pub struct ActivityLogger {
    sink: Arc<dyn ActivitySink>,
    store: Option<Arc<dyn ActivityStore>>,
    base_metadata: Metadata,
    default_currency: String,
}

impl ActivityLogger {
    pub fn new(app: &AppConfig, sink: Arc<dyn ActivitySink>) -> Self {
        let mut base_metadata = Metadata::new();
        base_metadata.insert("application".to_string(), json!(app.name));
        base_metadata.insert("environment".to_string(), json!(app.environment));

        Self {
            sink,
            store: None,
            base_metadata,
            default_currency: app.currency.clone(),
        }
    }

    /// Persist every record to `store` after it reaches the sink
    pub fn with_store(mut self, store: Arc<dyn ActivityStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build_record(
        &self,
        ctx: &ActivityContext,
        action: &str,
        description: &str,
        metadata: Metadata,
        level: LogLevel,
    ) -> ActivityRecord {
        let mut merged = self.base_metadata.clone();
        merged.extend(metadata);

        ActivityRecord {
            timestamp: Utc::now(),
            action: action.to_string(),
            description: description.to_string(),
            actor: ctx.actor.clone(),
            request: ctx.request.clone(),
            device: device::classify(ctx.request.user_agent.as_deref()),
            metadata: merged,
            session_id: ctx.session_id.clone(),
            level,
        }
    }

    /// Record one activity. Unknown `level` names are logged at `info`.
    pub async fn log_activity(
        &self,
        ctx: &ActivityContext,
        action: &str,
        description: &str,
        metadata: Metadata,
        level: &str,
    ) {
        let level = LogLevel::parse_or_default(level);
        let record = self.build_record(ctx, action, description, metadata, level);

        self.sink
            .emit(level, &format!("Activity Log: {}", action), &record);

        if let Some(store) = &self.store {
            if let Err(e) = store.store(&record).await {
                tracing::error!(
                    error = %e,
                    action = %record.action,
                    "Failed to store activity in database"
                );
            }
        }
    }

    pub async fn log_security_event(
        &self,
        ctx: &ActivityContext,
        event: &str,
        description: &str,
        mut metadata: Metadata,
    ) {
        metadata.insert("security_event".to_string(), json!(true));

        self.log_activity(
            ctx,
            &format!("SECURITY_EVENT: {}", event),
            description,
            metadata,
            LogLevel::Warning.as_str(),
        )
        .await
    }

    /// `currency` is taken from `metadata` when present, otherwise the
    /// application default
    pub async fn log_financial_transaction(
        &self,
        ctx: &ActivityContext,
        transaction_type: &str,
        amount: Decimal,
        mut metadata: Metadata,
    ) {
        metadata.insert("transaction_type".to_string(), json!(transaction_type));
        metadata.insert("amount".to_string(), json!(amount));
        metadata
            .entry("currency")
            .or_insert_with(|| json!(self.default_currency));

        self.log_activity(
            ctx,
            &format!("FINANCIAL_TRANSACTION: {}", transaction_type),
            &format!("Transaction of {:.2} executed", amount),
            metadata,
            LogLevel::Info.as_str(),
        )
        .await
    }

    /// Compliance trail for reads/writes of a resource; `access` defaults to `view`
    pub async fn log_data_access(
        &self,
        ctx: &ActivityContext,
        resource_type: &str,
        resource_id: &str,
        access: Option<&str>,
    ) {
        let access = access.unwrap_or("view");

        let mut metadata = Metadata::new();
        metadata.insert("resource_type".to_string(), json!(resource_type));
        metadata.insert("resource_id".to_string(), json!(resource_id));
        metadata.insert("access_type".to_string(), json!(access));

        self.log_activity(
            ctx,
            &format!("DATA_ACCESS: {}", access.to_uppercase()),
            &format!("{} accessed {}: {}", capitalize(access), resource_type, resource_id),
            metadata,
            LogLevel::Info.as_str(),
        )
        .await
    }

    pub async fn log_admin_action(
        &self,
        ctx: &ActivityContext,
        action: &str,
        description: &str,
        mut metadata: Metadata,
    ) {
        metadata.insert("admin_action".to_string(), json!(true));

        self.log_activity(
            ctx,
            &format!("ADMIN_ACTION: {}", action),
            description,
            metadata,
            LogLevel::Notice.as_str(),
        )
        .await
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
