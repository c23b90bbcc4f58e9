use axum::http::Uri;

use crate::error::AppError;

pub mod health;

pub use health::health_routes;

/// Fallback for unknown paths
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound {
        path: uri.path().to_string(),
    }
}
