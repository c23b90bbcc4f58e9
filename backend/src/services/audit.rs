use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use vitals_shared::ActivityRecord;

use crate::error::AuditError;

pub type AuditResult<T> = Result<T, AuditError>;

/// Durable audit trail for activity records
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn store(&self, record: &ActivityRecord) -> AuditResult<Uuid>;
}

/// Stores activity records in the `activity_logs` table
pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityStore for AuditService {
    async fn store(&self, record: &ActivityRecord) -> AuditResult<Uuid> {
        let payload = serde_json::to_value(record)?;

        let id: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO activity_logs (
                id, action, description, level, actor_id,
                ip_address, user_agent, session_id, payload, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.action)
        .bind(&record.description)
        .bind(record.level.as_str())
        .bind(record.actor.as_ref().map(|actor| actor.id.as_str()))
        .bind(record.request.ip.as_deref())
        .bind(record.request.user_agent.as_deref())
        .bind(record.session_id.as_deref())
        .bind(payload)
        .bind(record.timestamp)
        .fetch_one(&self.pool)
        .await?;

        Ok(id.0)
    }
}
