use chrono::Utc;
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;
use vitals_shared::{
    ApplicationInfo, ApplicationMetrics, BasicHealth, DetailedHealth, HealthReport, HealthStatus,
    Liveness, MetricsSnapshot, ProbeResult, Readiness, SystemMetrics,
};

use super::probe::{self, ProbeKind};
use crate::config::AppConfig;
use crate::database::DatabasePing;
use crate::services::cache::KeyValueCache;
use crate::services::metrics::ProcessSample;
use crate::services::storage::BlobStorage;

/// The collaborators probed by the health endpoints
#[derive(Clone)]
pub struct Dependencies {
    pub database: Arc<dyn DatabasePing>,
    pub cache: Arc<dyn KeyValueCache>,
    pub storage: Arc<dyn BlobStorage>,
    pub queue_connection: Option<String>,
}

/// Composes probe results into liveness, readiness and detailed reports.
///
/// Holds no mutable state; every call probes afresh.
pub struct HealthAggregator {
    dependencies: Dependencies,
    app: AppConfig,
    probe_timeout: Duration,
}

impl HealthAggregator {
    pub fn new(dependencies: Dependencies, app: AppConfig, probe_timeout: Duration) -> Self {
        Self {
            dependencies,
            app,
            probe_timeout,
        }
    }

    pub async fn probe(&self, kind: ProbeKind) -> ProbeResult {
        let deps = &self.dependencies;

        match kind {
            ProbeKind::Database => {
                probe::probe_database(deps.database.as_ref(), self.probe_timeout).await
            }
            ProbeKind::Cache => probe::probe_cache(deps.cache.as_ref(), self.probe_timeout).await,
            ProbeKind::Storage => {
                probe::probe_storage(deps.storage.as_ref(), self.probe_timeout).await
            }
            ProbeKind::Queue => probe::probe_queue(deps.queue_connection.as_deref()),
        }
    }

    pub fn basic(&self) -> BasicHealth {
        BasicHealth {
            status: HealthStatus::Healthy,
            timestamp: Utc::now(),
        }
    }

    /// The process is up; no dependency is consulted
    pub fn liveness(&self) -> Liveness {
        Liveness {
            alive: true,
            timestamp: Utc::now(),
        }
    }

    /// Ready to serve traffic. Only the database gates readiness.
    pub async fn readiness(&self) -> Readiness {
        let database = self.probe(ProbeKind::Database).await;

        Readiness {
            ready: database.healthy,
            timestamp: Utc::now(),
        }
    }

    pub async fn detailed(&self) -> DetailedHealth {
        let mut checks = IndexMap::with_capacity(ProbeKind::ALL.len());
        for kind in ProbeKind::ALL {
            checks.insert(kind.name().to_string(), self.probe(kind).await);
        }

        DetailedHealth {
            report: HealthReport::from_checks(checks),
            application: self.application_info(),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        let sample = ProcessSample::current();

        MetricsSnapshot {
            timestamp: Utc::now(),
            system: SystemMetrics {
                memory_usage_mb: sample.memory_mb(),
                memory_peak_mb: sample.peak_memory_mb(),
                uptime_seconds: sample.uptime_seconds,
            },
            application: ApplicationMetrics {
                name: self.app.name.clone(),
                environment: self.app.environment.clone(),
                debug_mode: self.app.debug,
                timezone: self.app.timezone.clone(),
            },
        }
    }

    pub fn application_info(&self) -> ApplicationInfo {
        ApplicationInfo {
            name: self.app.name.clone(),
            environment: self.app.environment.clone(),
            version: self.app.version.clone(),
            runtime: "rust".to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}
