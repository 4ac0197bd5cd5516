//! In-memory implementation of the BrokerClient trait for testing and development

use crate::{BrokerClient, BrokerMessage, BrokerResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;

/// BrokerClient implementation using in-memory channels
///
/// This implementation is suitable for:
/// - Unit tests (no external dependencies)
/// - Local development without Docker
/// - Integration tests that need a fast, isolated broker
///
/// Published messages are broadcast to every receiver obtained from
/// [`InMemoryBroker::subscribe`]. Receivers created after a publish do not
/// see earlier messages, so tests should subscribe before publishing.
///
/// # Example
/// ```rust
/// use message_broker::{BrokerClient, InMemoryBroker};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let broker = InMemoryBroker::new();
///
/// // Subscribe before publishing
/// let mut rx = broker.subscribe();
///
/// broker.publish("orders.audit.tasks", "1", b"hello".to_vec()).await?;
///
/// let msg = rx.recv().await?;
/// assert_eq!(msg.topic, "orders.audit.tasks");
/// assert_eq!(msg.key, "1");
/// assert_eq!(msg.payload, b"hello");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryBroker {
    // Global broadcast channel for all messages
    // Large buffer so slow test receivers do not drop messages
    sender: Arc<broadcast::Sender<BrokerMessage>>,
}

impl InMemoryBroker {
    /// Create a new in-memory broker
    ///
    /// The broker uses a broadcast channel with a buffer of 1000 messages.
    /// If this buffer is exceeded, the oldest messages will be dropped.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1000);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create a new in-memory broker with a custom buffer size
    ///
    /// # Arguments
    /// * `buffer_size` - The maximum number of messages to buffer before dropping old ones
    pub fn with_capacity(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Get a receiver for all messages published through this broker
    ///
    /// Each call returns an independent receiver; every receiver sees every
    /// message published after it was created.
    pub fn subscribe(&self) -> broadcast::Receiver<BrokerMessage> {
        self.sender.subscribe()
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerClient for InMemoryBroker {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> BrokerResult<()> {
        let msg = BrokerMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            payload,
        };

        // Ignore the error if there are no receivers (that's fine)
        let _ = self.sender.send(msg);

        Ok(())
    }
}
