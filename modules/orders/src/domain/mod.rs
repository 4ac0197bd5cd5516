pub mod audit;
pub mod error;
pub mod order;
pub mod outbox;
pub mod packaging;

pub use audit::{AuditEvent, RequestAuditRecord, StatusChangeRecord};
pub use error::OrderError;
pub use order::{Order, OrderStatus};
pub use outbox::{OutboxTask, TaskStatus, TaskType, MAX_ATTEMPTS, RETRY_BACKOFF_SECS};
pub use packaging::Packaging;
