//! NATS-based implementation of the BrokerClient trait

use crate::{BrokerClient, BrokerError, BrokerResult};
use async_nats::{Client, HeaderMap};
use async_trait::async_trait;

/// BrokerClient implementation backed by a NATS server
///
/// This is the production implementation. It wraps an `async_nats::Client`
/// and implements the `BrokerClient` trait.
///
/// NATS subjects carry no partition key, so the key is folded into the
/// subject (`{topic}.{key}`) and also sent as a `Message-Key` header.
/// Subscribers that want all keys subscribe to `{topic}.>`.
///
/// # Example
/// ```rust,no_run
/// use message_broker::{BrokerClient, NatsBroker};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let nats_client = async_nats::connect("nats://localhost:4222").await?;
/// let broker = NatsBroker::new(nats_client);
///
/// broker
///     .publish("orders.audit.tasks", "42", b"{}".to_vec())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct NatsBroker {
    client: Client,
}

impl NatsBroker {
    /// Create a new NatsBroker from an existing NATS client
    ///
    /// # Arguments
    /// * `client` - An already-connected `async_nats::Client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying NATS client
    ///
    /// Useful for advanced use cases that need direct access to NATS
    /// features not exposed through the BrokerClient trait.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl BrokerClient for NatsBroker {
    async fn publish(&self, topic: &str, key: &str, payload: Vec<u8>) -> BrokerResult<()> {
        if topic.is_empty() {
            return Err(BrokerError::InvalidTopic("topic must not be empty".into()));
        }

        let subject = format!("{topic}.{key}");
        let mut headers = HeaderMap::new();
        headers.insert("Message-Key", key);

        self.client
            .publish_with_headers(subject, headers, payload.into())
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    // Note: These tests require a running NATS server
    // For CI, use InMemoryBroker tests instead
    // For manual testing: docker run -p 4222:4222 nats:2.10-alpine

    #[tokio::test]
    #[ignore] // Requires NATS server
    async fn test_nats_broker_keyed_publish() {
        let client = async_nats::connect("nats://localhost:4222")
            .await
            .expect("NATS server must be running on localhost:4222");

        let broker = NatsBroker::new(client);

        let mut subscriber = broker
            .client()
            .subscribe("test.broker.tasks.>")
            .await
            .unwrap();

        let payload = b"task payload".to_vec();
        broker
            .publish("test.broker.tasks", "17", payload.clone())
            .await
            .unwrap();

        let msg = tokio::time::timeout(std::time::Duration::from_secs(2), subscriber.next())
            .await
            .expect("timeout waiting for message")
            .expect("subscription ended");

        assert_eq!(msg.subject.as_str(), "test.broker.tasks.17");
        assert_eq!(msg.payload.to_vec(), payload);

        let headers = msg.headers.expect("headers present");
        let key = headers.get("Message-Key").expect("Message-Key header");
        assert_eq!(key.as_str(), "17");
    }

    #[tokio::test]
    #[ignore] // Requires NATS server
    async fn test_nats_broker_rejects_empty_topic() {
        let client = async_nats::connect("nats://localhost:4222")
            .await
            .expect("NATS server must be running on localhost:4222");

        let broker = NatsBroker::new(client);
        let result = broker.publish("", "1", b"x".to_vec()).await;
        assert!(matches!(result, Err(BrokerError::InvalidTopic(_))));
    }
}
