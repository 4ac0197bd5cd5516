//! # Broker Client Abstraction
//!
//! A platform-level abstraction for publishing keyed messages to a broker.
//!
//! The outbox dispatchers in the modules publish one message per call and
//! rely on the store for batching and retry, so the client surface is
//! deliberately small: a single `publish`.
//!
//! ## Implementations
//!
//! - **NatsBroker**: Production implementation backed by NATS
//! - **InMemoryBroker**: Test/dev implementation using broadcast channels
//!
//! ## Usage
//!
//! ```rust,no_run
//! use message_broker::{BrokerClient, InMemoryBroker, NatsBroker};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Production: NATS
//! let nats_client = async_nats::connect("nats://localhost:4222").await?;
//! let broker: Arc<dyn BrokerClient> = Arc::new(NatsBroker::new(nats_client));
//!
//! // Dev/Test: In-Memory
//! let broker: Arc<dyn BrokerClient> = Arc::new(InMemoryBroker::new());
//!
//! broker
//!     .publish("orders.audit.tasks", "42", b"{\"task_id\":42}".to_vec())
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod inmemory;
mod nats;

pub use inmemory::InMemoryBroker;
pub use nats::NatsBroker;

use async_trait::async_trait;
use std::fmt;

/// A keyed message as delivered by the broker
#[derive(Debug, Clone)]
pub struct BrokerMessage {
    /// The topic the message was published to
    pub topic: String,
    /// The partitioning/routing key, chosen by the publisher
    pub key: String,
    /// The message payload (raw bytes)
    pub payload: Vec<u8>,
}

/// Errors that can occur when using the broker client
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("failed to publish message: {0}")]
    Publish(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("invalid topic: {0}")]
    InvalidTopic(String),
}

/// Result type for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Core broker abstraction for keyed publishing
///
/// One message per call, no client-side batching. Callers that need
/// delivery guarantees layer an outbox on top of this interface.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Publish a single keyed message to a topic
    ///
    /// # Arguments
    /// * `topic` - The topic to publish to (e.g., "orders.audit.tasks")
    /// * `key` - The routing key for the message (e.g., an outbox task id)
    /// * `payload` - The message payload as raw bytes
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> BrokerResult<()>;
}

impl fmt::Debug for dyn BrokerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BrokerClient")
    }
}
