//! Persistence stage sink
//!
//! Writes each audit job to its audit table and enqueues a matching outbox
//! task. A failed audit insert skips that job only; a failed task insert
//! fails the whole batch, because an audit row without its outbox task would
//! never be delivered.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::{AuditEvent, RequestAuditRecord, StatusChangeRecord, TaskType};

use super::stage::BatchSink;
use super::PipelineError;

/// Persistence operations the audit pipeline needs
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert_request_audit(&self, record: &RequestAuditRecord)
        -> Result<i64, PipelineError>;

    async fn insert_status_audit(&self, record: &StatusChangeRecord)
        -> Result<i64, PipelineError>;

    async fn create_task(&self, entry_id: i64, task_type: TaskType) -> Result<i64, PipelineError>;
}

/// Batch sink that persists audit jobs and their outbox tasks
pub struct PersistenceSink {
    store: Arc<dyn AuditStore>,
}

impl PersistenceSink {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchSink<AuditEvent> for PersistenceSink {
    async fn process_batch(&self, batch: &[AuditEvent]) -> Result<(), PipelineError> {
        for event in batch {
            let (entry, task_type) = match event {
                AuditEvent::Request(record) => {
                    (self.store.insert_request_audit(record).await, TaskType::AuditLog)
                }
                AuditEvent::StatusChange(record) => {
                    (self.store.insert_status_audit(record).await, TaskType::OrderStatusLog)
                }
            };

            let entry_id = match entry {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!(error = %e, "audit insert failed, skipping job");
                    continue;
                }
            };

            self.store.create_task(entry_id, task_type).await?;
        }

        Ok(())
    }
}
