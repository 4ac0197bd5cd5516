use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{OutboxTask, RequestAuditRecord, StatusChangeRecord, TaskType};
use crate::pipeline::{AuditStore, OutboxStore, PipelineError};

use super::{audit_repo, outbox_repo};

/// Postgres-backed implementation of the pipeline store traits
///
/// Thin adapter over the repo functions; the SQL carries the actual
/// lease and reconciliation semantics.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn insert_request_audit(
        &self,
        record: &RequestAuditRecord,
    ) -> Result<i64, PipelineError> {
        Ok(audit_repo::insert_request_audit(&self.pool, record).await?)
    }

    async fn insert_status_audit(
        &self,
        record: &StatusChangeRecord,
    ) -> Result<i64, PipelineError> {
        Ok(audit_repo::insert_status_audit(&self.pool, record).await?)
    }

    async fn create_task(&self, entry_id: i64, task_type: TaskType) -> Result<i64, PipelineError> {
        Ok(outbox_repo::create_task(&self.pool, entry_id, task_type).await?)
    }
}

#[async_trait]
impl OutboxStore for PgStore {
    async fn lease_ready(&self, limit: i64) -> Result<Vec<OutboxTask>, PipelineError> {
        Ok(outbox_repo::lease_ready(&self.pool, limit).await?)
    }

    async fn delete_completed(&self, task_ids: &[i64]) -> Result<u64, PipelineError> {
        Ok(outbox_repo::delete_completed(&self.pool, task_ids).await?)
    }

    async fn mark_failed(&self, task_ids: &[i64]) -> Result<u64, PipelineError> {
        Ok(outbox_repo::mark_failed(&self.pool, task_ids).await?)
    }

    async fn release_stale(&self, older_than_secs: i64) -> Result<u64, PipelineError> {
        Ok(outbox_repo::release_stale(&self.pool, older_than_secs).await?)
    }
}
