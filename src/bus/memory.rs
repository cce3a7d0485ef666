use super::{BusMessage, MessageBus, INBOUND_CHANNEL_SIZE};
use crate::{error::BusError, topics};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct MemoryBusState {
    subscriptions: Vec<String>,
    published: Vec<BusMessage>,
}

/// In process bus. Remembers everything published and lets callers inject inbound traffic.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    state: Arc<Mutex<MemoryBusState>>,
    sender: mpsc::Sender<BusMessage>,
}

impl MemoryBus {
    pub fn new() -> (Self, mpsc::Receiver<BusMessage>) {
        let (sender, receiver) = mpsc::channel(INBOUND_CHANNEL_SIZE);
        let bus = Self {
            state: Arc::new(Mutex::new(MemoryBusState::default())),
            sender,
        };
        (bus, receiver)
    }

    /// Delivers `message` if it matches a subscription. Returns whether it was delivered.
    pub async fn inject(&self, message: BusMessage) -> Result<bool, BusError> {
        let subscribed = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscriptions
            .iter()
            .any(|pattern| topics::matches(pattern, &message.topic));
        if !subscribed {
            return Ok(false);
        }
        self.sender
            .send(message)
            .await
            .map_err(|_| BusError::Closed)?;
        Ok(true)
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscriptions
            .clone()
    }

    pub fn published(&self) -> Vec<BusMessage> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .published
            .clone()
    }
}

#[async_trait]
impl MessageBus for MemoryBus {
    async fn subscribe(&self, pattern: &str) -> Result<(), BusError> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscriptions
            .push(pattern.to_owned());
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), BusError> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .published
            .push(BusMessage::new(topic, payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_subscribed_topics_are_delivered() {
        let (bus, mut receiver) = MemoryBus::new();
        bus.subscribe(topics::PRESENCE_PATTERN).await.unwrap();

        let delivered = bus
            .inject(BusMessage::new("/robot/1/$online$", "1"))
            .await
            .unwrap();
        assert!(delivered);
        let ignored = bus
            .inject(BusMessage::new("/robot/1/$name$", "bob"))
            .await
            .unwrap();
        assert!(!ignored);

        let message = receiver.recv().await.unwrap();
        assert_eq!(message.topic, "/robot/1/$online$");
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn publishes_are_recorded() {
        let (bus, _receiver) = MemoryBus::new();
        bus.publish("/robot/1/motors", "1,2".to_owned())
            .await
            .unwrap();
        assert_eq!(
            bus.published(),
            vec![BusMessage::new("/robot/1/motors", "1,2")]
        );
    }
}
