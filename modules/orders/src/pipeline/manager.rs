//! Audit pipeline lifecycle
//!
//! Wires the persistence stage into the presentation stage, drains the final
//! output, and runs the outbox dispatcher beside them. Producers hand events
//! in through a bounded channel; when it is full the event is dropped with a
//! warning rather than blocking the caller.

use message_broker::BrokerClient;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::domain::AuditEvent;

use super::dispatcher::{OutboxDispatcher, OutboxStore};
use super::persist::{AuditStore, PersistenceSink};
use super::present::PresentationSink;
use super::stage;

/// Tunables for the audit pipeline and the outbox dispatcher
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub buffer_size: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub filter_word: Option<String>,
    pub outbox_topic: String,
    pub poll_interval: Duration,
    pub lease_limit: i64,
    pub stale_after_secs: i64,
}

/// Running audit pipeline
///
/// Created by [`AuditPipeline::start`]; submit events with
/// [`AuditPipeline::submit`] and stop everything with
/// [`AuditPipeline::shutdown`].
pub struct AuditPipeline {
    input: Mutex<Option<mpsc::Sender<AuditEvent>>>,
    shutdown_tx: watch::Sender<bool>,
    stage_workers: Mutex<Vec<JoinHandle<()>>>,
    dispatcher_worker: Mutex<Option<JoinHandle<()>>>,
}

impl AuditPipeline {
    /// Start the pipeline workers and the dispatcher
    pub fn start(
        config: PipelineConfig,
        audit_store: Arc<dyn AuditStore>,
        outbox_store: Arc<dyn OutboxStore>,
        broker: Arc<dyn BrokerClient>,
    ) -> Arc<Self> {
        let (input_tx, input_rx) = mpsc::channel(config.buffer_size);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let (persisted_rx, persist_handle) = stage::spawn(
            Arc::new(PersistenceSink::new(audit_store)),
            config.batch_size,
            config.flush_interval,
            input_rx,
            shutdown_rx.clone(),
        );

        let (mut presented_rx, present_handle) = stage::spawn(
            Arc::new(PresentationSink::new(config.filter_word.clone())),
            config.batch_size,
            config.flush_interval,
            persisted_rx,
            shutdown_rx.clone(),
        );

        // Drain the tail of the chain so forwarding never blocks
        let drain_handle = tokio::spawn(async move {
            while presented_rx.recv().await.is_some() {}
        });

        let dispatcher = OutboxDispatcher::new(
            outbox_store,
            broker,
            config.outbox_topic.clone(),
            config.poll_interval,
            config.lease_limit,
            config.stale_after_secs,
        );
        let dispatcher_handle = tokio::spawn(async move {
            dispatcher.run(shutdown_rx).await;
        });

        tracing::info!(
            buffer_size = config.buffer_size,
            batch_size = config.batch_size,
            "Audit pipeline started"
        );

        Arc::new(Self {
            input: Mutex::new(Some(input_tx)),
            shutdown_tx,
            stage_workers: Mutex::new(vec![persist_handle, present_handle, drain_handle]),
            dispatcher_worker: Mutex::new(Some(dispatcher_handle)),
        })
    }

    /// Hand an event to the pipeline without waiting
    ///
    /// Dropped with a warning when the buffer is full or the pipeline has
    /// been shut down; producers never block or fail on audit problems.
    pub fn submit(&self, event: AuditEvent) {
        let input = self
            .input
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match input.as_ref() {
            Some(tx) => {
                if let Err(e) = tx.try_send(event) {
                    match e {
                        mpsc::error::TrySendError::Full(_) => {
                            tracing::warn!("audit buffer full, dropping job");
                        }
                        mpsc::error::TrySendError::Closed(_) => {
                            tracing::warn!("audit pipeline closed, dropping job");
                        }
                    }
                }
            }
            None => {
                tracing::warn!("audit pipeline stopped, dropping job");
            }
        }
    }

    /// Ask every worker to stop without waiting for them
    ///
    /// Used by the signal handler; `shutdown` performs the full drain and
    /// join.
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Gracefully stop the pipeline
    ///
    /// Closes the ingestion channel and waits for the stages to drain what
    /// they already accepted, then signals the dispatcher and joins it.
    pub async fn shutdown(&self) {
        self.input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let stage_handles = std::mem::take(
            &mut *self
                .stage_workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in stage_handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "pipeline worker ended abnormally");
            }
        }

        let _ = self.shutdown_tx.send(true);

        let dispatcher_handle = self
            .dispatcher_worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = dispatcher_handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "outbox dispatcher ended abnormally");
            }
        }

        tracing::info!("Audit pipeline shut down");
    }
}
