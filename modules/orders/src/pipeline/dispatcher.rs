//! Outbox dispatcher
//!
//! Periodic loop that leases ready outbox tasks, publishes each one to the
//! broker keyed by task id, deletes the successes, and records failed
//! attempts. Errors are logged and never abort the loop, so delivery is
//! at-least-once and resumes on the next cycle.

use async_trait::async_trait;
use message_broker::BrokerClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant};

use crate::domain::OutboxTask;

use super::PipelineError;

/// Outbox operations the dispatcher needs
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Atomically move up to `limit` ready tasks to PROCESSING and return them
    async fn lease_ready(&self, limit: i64) -> Result<Vec<OutboxTask>, PipelineError>;

    /// Remove delivered tasks; unknown ids are ignored
    async fn delete_completed(&self, task_ids: &[i64]) -> Result<u64, PipelineError>;

    /// Charge one failed attempt per task, applying backoff or terminal state
    async fn mark_failed(&self, task_ids: &[i64]) -> Result<u64, PipelineError>;

    /// Return PROCESSING tasks older than the timeout to CREATED
    async fn release_stale(&self, older_than_secs: i64) -> Result<u64, PipelineError>;
}

/// Background publisher for the transactional outbox
pub struct OutboxDispatcher {
    store: Arc<dyn OutboxStore>,
    broker: Arc<dyn BrokerClient>,
    topic: String,
    poll_interval: Duration,
    lease_limit: i64,
    stale_after_secs: i64,
}

impl OutboxDispatcher {
    pub fn new(
        store: Arc<dyn OutboxStore>,
        broker: Arc<dyn BrokerClient>,
        topic: String,
        poll_interval: Duration,
        lease_limit: i64,
        stale_after_secs: i64,
    ) -> Self {
        Self {
            store,
            broker,
            topic,
            poll_interval,
            lease_limit,
            stale_after_secs,
        }
    }

    /// Run until the shutdown signal fires
    ///
    /// Stale PROCESSING leases are released once at startup (covers tasks
    /// orphaned by a crash between lease and reconcile) and again on every
    /// cycle.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(topic = %self.topic, "Outbox dispatcher started");

        self.sweep_stale().await;

        let start = Instant::now() + self.poll_interval;
        let mut ticker = interval_at(start, self.poll_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_stale().await;
                    self.run_cycle().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Outbox dispatcher stopped");
    }

    /// One dispatch cycle: lease, publish, reconcile
    pub async fn run_cycle(&self) {
        let tasks = match self.store.lease_ready(self.lease_limit).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!(error = %e, "failed to lease outbox tasks");
                return;
            }
        };

        if tasks.is_empty() {
            return;
        }

        tracing::debug!(count = tasks.len(), "leased outbox tasks");

        let mut delivered = Vec::with_capacity(tasks.len());
        let mut failed = Vec::new();

        for task in &tasks {
            match self.publish_task(task).await {
                Ok(()) => delivered.push(task.task_id),
                Err(e) => {
                    tracing::error!(task_id = %task.task_id, error = %e, "failed to publish outbox task");
                    failed.push(task.task_id);
                }
            }
        }

        if let Err(e) = self.store.delete_completed(&delivered).await {
            tracing::error!(error = %e, "failed to delete delivered outbox tasks");
        }

        if let Err(e) = self.store.mark_failed(&failed).await {
            tracing::error!(error = %e, "failed to record outbox task failures");
        }
    }

    async fn publish_task(&self, task: &OutboxTask) -> Result<(), PipelineError> {
        let payload = serde_json::to_vec(task)
            .map_err(|e| PipelineError::Store(format!("serialize task: {e}")))?;

        self.broker
            .publish(&self.topic, &task.task_id.to_string(), payload)
            .await
            .map_err(|e| PipelineError::Store(e.to_string()))
    }

    async fn sweep_stale(&self) {
        match self.store.release_stale(self.stale_after_secs).await {
            Ok(0) => {}
            Ok(released) => {
                tracing::warn!(released = %released, "released stale in-flight outbox tasks");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to release stale outbox tasks");
            }
        }
    }
}
