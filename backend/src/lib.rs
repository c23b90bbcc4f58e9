use axum::{http::Method, routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod services;


use health::HealthAggregator;
use services::{ActivityLogger, TrustedProxies};

pub struct AppState {
    pub health: HealthAggregator,
    pub activity: ActivityLogger,
    /// Peers allowed to set forwarding headers
    pub trusted_proxies: TrustedProxies,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "Vitals health service" }))
        .merge(handlers::health_routes())
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::observability_layer))
                .layer(axum::middleware::from_fn(middleware::security_headers))
                .layer(cors),
        )
        .with_state(state)
}
