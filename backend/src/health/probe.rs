//! Dependency probes
//!
//! Each probe performs one bounded check against a dependency and always
//! returns a [`ProbeResult`]; failures never escape as errors. Probes that
//! write a transient artifact (cache, storage) attempt to remove it whatever
//! the outcome of the check, and a failed cleanup is logged without changing
//! the result.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;
use vitals_shared::ProbeResult;

use crate::database::DatabasePing;
use crate::error::{ProbeError, StorageError};
use crate::services::cache::{cache_keys, ttl, KeyValueCache};
use crate::services::metrics::Timer;
use crate::services::storage::BlobStorage;

pub const CACHE_TEST_VALUE: &str = "test_value";
pub const STORAGE_TEST_CONTENT: &str = "Health check test";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Database,
    Cache,
    Storage,
    Queue,
}

impl ProbeKind {
    /// Order in which detailed health reports list the checks
    pub const ALL: [ProbeKind; 4] = [Self::Database, Self::Cache, Self::Storage, Self::Queue];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Cache => "cache",
            Self::Storage => "storage",
            Self::Queue => "queue",
        }
    }
}

/// Run `operation` with an upper bound on its duration
async fn bounded<T, E, F>(limit: Duration, operation: F) -> Result<T, ProbeError>
where
    F: Future<Output = Result<T, E>>,
    ProbeError: From<E>,
{
    match timeout(limit, operation).await {
        Ok(result) => result.map_err(ProbeError::from),
        Err(_) => Err(ProbeError::Timeout(limit)),
    }
}

pub async fn probe_database(database: &dyn DatabasePing, limit: Duration) -> ProbeResult {
    let name = ProbeKind::Database.name();
    let timer = Timer::start();

    match bounded(limit, database.ping()).await {
        Ok(()) => ProbeResult::healthy(name, "Database connection successful")
            .with_detail("latency_ms", timer.elapsed_ms().to_string()),
        Err(e) => {
            tracing::warn!(probe = name, error = %e, "Health probe failed");
            ProbeResult::unhealthy(name, "Database connection failed").with_error(e.to_string())
        }
    }
}

/// Write, read back and delete a uniquely-named key
pub async fn probe_cache(cache: &dyn KeyValueCache, limit: Duration) -> ProbeResult {
    let name = ProbeKind::Cache.name();
    let key = cache_keys::health_check();

    let check = bounded(limit, async {
        cache.put(&key, CACHE_TEST_VALUE, ttl::HEALTH_CHECK).await?;
        cache.get(&key).await
    })
    .await;

    if let Err(e) = bounded(limit, cache.forget(&key)).await {
        tracing::warn!(probe = name, key = %key, error = %e, "Health probe cleanup failed");
    }

    let result = match check {
        Ok(Some(value)) if value == CACHE_TEST_VALUE => {
            ProbeResult::healthy(name, "Cache system operational")
        }
        Ok(_) => ProbeResult::unhealthy(name, "Cache verification failed"),
        Err(e) => {
            tracing::warn!(probe = name, error = %e, "Health probe failed");
            ProbeResult::unhealthy(name, "Cache system failed").with_error(e.to_string())
        }
    };

    result.with_detail("driver", cache.driver())
}

/// Write a test object, check it exists, read it back and delete it
pub async fn probe_storage(storage: &dyn BlobStorage, limit: Duration) -> ProbeResult {
    let name = ProbeKind::Storage.name();
    let object = format!("health_check_{}.txt", Uuid::new_v4().simple());

    let check = bounded(limit, async {
        storage.put(&object, STORAGE_TEST_CONTENT.as_bytes()).await?;
        let exists = storage.exists(&object).await?;
        let content = storage.get(&object).await?;
        Ok::<_, StorageError>(exists && content == STORAGE_TEST_CONTENT.as_bytes())
    })
    .await;

    if let Err(e) = bounded(limit, storage.delete(&object)).await {
        tracing::warn!(probe = name, object = %object, error = %e, "Health probe cleanup failed");
    }

    let result = match check {
        Ok(true) => ProbeResult::healthy(name, "Storage system operational"),
        Ok(false) => ProbeResult::unhealthy(name, "Storage verification failed"),
        Err(e) => {
            tracing::warn!(probe = name, error = %e, "Health probe failed");
            ProbeResult::unhealthy(name, "Storage system failed").with_error(e.to_string())
        }
    };

    result.with_detail("driver", storage.driver())
}

/// Healthy when a queue backend is configured.
///
/// This does not open a connection to the queue; a configured but unreachable
/// backend still reports healthy.
pub fn probe_queue(connection: Option<&str>) -> ProbeResult {
    let name = ProbeKind::Queue.name();

    match connection {
        Some(connection) => ProbeResult::healthy(name, "Queue system configured")
            .with_detail("connection", connection),
        None => ProbeResult::unhealthy(name, "Queue system not configured"),
    }
}
