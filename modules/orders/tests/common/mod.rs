//! Common test utilities for the orders integration tests
//!
//! `MemStore` implements both pipeline store traits on top of the domain
//! task state machine, so the suites run without Postgres.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use orders_rs::domain::{
    OutboxTask, RequestAuditRecord, StatusChangeRecord, TaskStatus, TaskType,
};
use orders_rs::pipeline::{AuditStore, OutboxStore, PipelineError};

/// In-memory audit and outbox store
#[derive(Default)]
pub struct MemStore {
    next_entry_id: AtomicI64,
    next_task_id: AtomicI64,
    pub request_audits: Mutex<Vec<(i64, RequestAuditRecord)>>,
    pub status_audits: Mutex<Vec<(i64, StatusChangeRecord)>>,
    pub tasks: Mutex<Vec<OutboxTask>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_paths(&self) -> Vec<String> {
        self.request_audits
            .lock()
            .unwrap()
            .iter()
            .map(|(_, record)| record.path.clone())
            .collect()
    }

    pub fn task_snapshot(&self) -> Vec<OutboxTask> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditStore for MemStore {
    async fn insert_request_audit(
        &self,
        record: &RequestAuditRecord,
    ) -> Result<i64, PipelineError> {
        let entry_id = self.next_entry_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.request_audits
            .lock()
            .unwrap()
            .push((entry_id, record.clone()));
        Ok(entry_id)
    }

    async fn insert_status_audit(
        &self,
        record: &StatusChangeRecord,
    ) -> Result<i64, PipelineError> {
        let entry_id = self.next_entry_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.status_audits
            .lock()
            .unwrap()
            .push((entry_id, record.clone()));
        Ok(entry_id)
    }

    async fn create_task(&self, entry_id: i64, task_type: TaskType) -> Result<i64, PipelineError> {
        let task_id = self.next_task_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();

        self.tasks.lock().unwrap().push(OutboxTask {
            task_id,
            task_status: TaskStatus::Created,
            task_type,
            entry_id,
            created_at: now,
            updated_at: now,
            attempts_count: 0,
            next_attempt_at: now,
            finished_at: None,
        });

        Ok(task_id)
    }
}

#[async_trait]
impl OutboxStore for MemStore {
    async fn lease_ready(&self, limit: i64) -> Result<Vec<OutboxTask>, PipelineError> {
        let now = Utc::now();
        let mut tasks = self.tasks.lock().unwrap();

        let mut leased = Vec::new();
        for task in tasks.iter_mut() {
            if leased.len() as i64 >= limit {
                break;
            }
            if task.is_ready(now) {
                task.mark_processing(now);
                leased.push(task.clone());
            }
        }

        Ok(leased)
    }

    async fn delete_completed(&self, task_ids: &[i64]) -> Result<u64, PipelineError> {
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|task| !task_ids.contains(&task.task_id));
        Ok((before - tasks.len()) as u64)
    }

    async fn mark_failed(&self, task_ids: &[i64]) -> Result<u64, PipelineError> {
        let now = Utc::now();
        let mut tasks = self.tasks.lock().unwrap();

        let mut updated = 0;
        for task in tasks.iter_mut() {
            if task_ids.contains(&task.task_id) {
                task.record_failure(now);
                updated += 1;
            }
        }

        Ok(updated)
    }

    async fn release_stale(&self, older_than_secs: i64) -> Result<u64, PipelineError> {
        let now = Utc::now();
        let timeout = Duration::seconds(older_than_secs);
        let mut tasks = self.tasks.lock().unwrap();

        let mut released = 0;
        for task in tasks.iter_mut() {
            if task.is_stale(now, timeout) {
                task.release(now);
                released += 1;
            }
        }

        Ok(released)
    }
}
