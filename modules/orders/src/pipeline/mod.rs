pub mod dispatcher;
pub mod manager;
pub mod persist;
pub mod present;
pub mod stage;

pub use dispatcher::{OutboxDispatcher, OutboxStore};
pub use manager::{AuditPipeline, PipelineConfig};
pub use persist::{AuditStore, PersistenceSink};
pub use present::PresentationSink;
pub use stage::BatchSink;

/// Errors produced by pipeline stages and their stores
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(String),
}
