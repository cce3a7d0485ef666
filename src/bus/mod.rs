pub mod memory;
pub mod mqtt;
pub mod zenoh_bus;

use crate::error::BusError;
use async_trait::async_trait;
use bytes::Bytes;

/// Inbound message with its canonical mqtt style topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Bytes,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Publish/subscribe transport.
///
/// Messages matching subscribed patterns are delivered on the channel
/// handed out by the backend constructor. Reconnecting is the backend's job.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn subscribe(&self, pattern: &str) -> Result<(), BusError>;

    /// Returns once the message is handed to the transport. Delivery is not confirmed.
    async fn publish(&self, topic: &str, payload: String) -> Result<(), BusError>;
}

const INBOUND_CHANNEL_SIZE: usize = 100;
