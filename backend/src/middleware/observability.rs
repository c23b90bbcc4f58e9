use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::services::Timer;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Middleware layer for request observability
/// Tags each request with an id and logs method, path, status and timing
pub async fn observability_layer(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let timer = Timer::start();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let status = response.status().as_u16();
    let duration_ms = timer.elapsed_ms();

    if status >= 500 {
        tracing::error!(%request_id, %method, %path, status, duration_ms, "Request failed");
    } else if status >= 400 {
        tracing::warn!(%request_id, %method, %path, status, duration_ms, "Request rejected");
    } else {
        tracing::info!(%request_id, %method, %path, status, duration_ms, "Request completed");
    }

    response
}

/// Normalize path to group similar endpoints (e.g., /api/v1/tickets/123 -> /api/v1/tickets/:id)
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if Uuid::parse_str(segment).is_ok() || segment.parse::<i64>().is_ok() {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
