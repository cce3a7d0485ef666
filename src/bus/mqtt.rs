use super::{BusMessage, MessageBus, INBOUND_CHANNEL_SIZE};
use crate::{configuration::MqttConfig, error::BusError};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::sync::mpsc;
use tracing::*;

const REQUEST_CHANNEL_SIZE: usize = 10;
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

pub struct MqttBus {
    client: AsyncClient,
    subscriptions: Arc<Mutex<Vec<String>>>,
}

impl MqttBus {
    /// Starts the mqtt event loop in the background.
    pub fn connect(config: &MqttConfig) -> (Self, mpsc::Receiver<BusMessage>) {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        if let Some(username) = &config.username {
            options.set_credentials(username, config.password.clone().unwrap_or_default());
        }
        info!("MQTT connecting to {}:{}", config.host, config.port);

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_SIZE);
        let (sender, receiver) = mpsc::channel(INBOUND_CHANNEL_SIZE);
        let subscriptions = Arc::new(Mutex::new(Vec::new()));

        tokio::spawn(run_event_loop(
            event_loop,
            client.clone(),
            subscriptions.clone(),
            sender,
        ));

        (
            Self {
                client,
                subscriptions,
            },
            receiver,
        )
    }
}

async fn run_event_loop(
    mut event_loop: EventLoop,
    client: AsyncClient,
    subscriptions: Arc<Mutex<Vec<String>>>,
    sender: mpsc::Sender<BusMessage>,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                debug!("Got message: {}: {:?}", publish.topic, publish.payload);
                let message = BusMessage::new(publish.topic, publish.payload);
                if sender.send(message).await.is_err() {
                    info!("Inbound channel closed. Stopping mqtt loop");
                    return;
                }
            }
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!("MQTT connected {:?}", ack.code);
                // broker forgets subscriptions of clean sessions
                let patterns = subscriptions
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                for pattern in patterns {
                    if let Err(err) = client.try_subscribe(&pattern, QoS::AtMostOnce) {
                        error!("Failed to resubscribe to {} with {:?}", pattern, err);
                    }
                }
            }
            Ok(_) => {}
            Err(err) => {
                warn!("MQTT connection error {:?}", err);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

#[async_trait]
impl MessageBus for MqttBus {
    async fn subscribe(&self, pattern: &str) -> Result<(), BusError> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(pattern.to_owned());
        self.client.subscribe(pattern, QoS::AtMostOnce).await?;
        info!("Subscribed to {}", pattern);
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), BusError> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.into_bytes())
            .await?;
        Ok(())
    }
}
