use super::{BusMessage, MessageBus, INBOUND_CHANNEL_SIZE};
use crate::{configuration::ZenohBusConfig, error::BusError, topics};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::*;
use zenoh::{prelude::r#async::*, subscriber::FlumeSubscriber, Session, SessionDeclarations};

/// Zenoh transport for robots bridged from mqtt.
///
/// Topics are translated with [`topics::to_key_expr`] on the way out and
/// restored to their canonical form on the way in.
pub struct ZenohBus {
    session: Arc<Session>,
    sender: mpsc::Sender<BusMessage>,
}

impl ZenohBus {
    pub async fn connect(
        config: &ZenohBusConfig,
    ) -> Result<(Self, mpsc::Receiver<BusMessage>), BusError> {
        let zenoh_config = config.get_zenoh_config()?;
        let session = zenoh::open(zenoh_config)
            .res()
            .await
            .map_err(BusError::Zenoh)?
            .into_arc();
        info!("Zenoh session opened");
        let (sender, receiver) = mpsc::channel(INBOUND_CHANNEL_SIZE);
        Ok((Self { session, sender }, receiver))
    }
}

async fn run_subscriber(
    pattern: String,
    subscriber: FlumeSubscriber<'static>,
    sender: mpsc::Sender<BusMessage>,
) {
    while let Ok(sample) = subscriber.recv_async().await {
        let key = sample.key_expr.as_str();
        let Some(topic) = topics::topic_from_key_expr(&pattern, key) else {
            warn!("Key {} does not fit pattern {}", key, pattern);
            continue;
        };
        let payload = sample.value.payload.contiguous().to_vec();
        debug!("Got message: {}: {:?}", topic, payload);
        if sender.send(BusMessage::new(topic, payload)).await.is_err() {
            info!("Inbound channel closed. Stopping subscriber for {}", pattern);
            return;
        }
    }
    error!("Zenoh subscriber for {} ended", pattern);
}

#[async_trait]
impl MessageBus for ZenohBus {
    async fn subscribe(&self, pattern: &str) -> Result<(), BusError> {
        let key_expr = topics::to_key_expr(pattern);
        let subscriber = self
            .session
            .declare_subscriber(key_expr.clone())
            .res()
            .await
            .map_err(BusError::Zenoh)?;
        info!("Subscribed to {} as {}", pattern, key_expr);
        tokio::spawn(run_subscriber(
            pattern.to_owned(),
            subscriber,
            self.sender.clone(),
        ));
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), BusError> {
        self.session
            .put(topics::to_key_expr(topic), payload)
            .res_async()
            .await
            .map_err(BusError::Zenoh)?;
        Ok(())
    }
}
