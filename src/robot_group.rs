use crate::{
    bus::{BusMessage, MessageBus},
    error::{BusError, RobotError},
    robot::Robot,
    topics::{self, RobotEvent},
};
use chrono::{DateTime, Utc};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::*;

/// Stored when a robot announces a name that isn't ascii.
pub const UNDECODABLE_NAME: &str = "WFT";

#[derive(Debug, Default)]
struct Registry {
    /// `None` means the robot announced that it went offline.
    last_seen: BTreeMap<String, Option<DateTime<Utc>>>,
    names: HashMap<String, String>,
}

impl Registry {
    fn snapshot(&self, id: &str, bus: &Arc<dyn MessageBus>) -> Option<Robot> {
        let last_seen = *self.last_seen.get(id)?;
        Some(Robot::new(
            id.to_owned(),
            self.names.get(id).cloned(),
            last_seen,
            bus.clone(),
        ))
    }
}

/// Registry of every robot that ever announced its presence.
pub struct RobotGroup {
    bus: Arc<dyn MessageBus>,
    registry: Mutex<Registry>,
}

impl RobotGroup {
    pub fn new(bus: Arc<dyn MessageBus>) -> Self {
        Self {
            bus,
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Subscribes to presence and name announcements of all robots.
    pub async fn subscribe(&self) -> Result<(), BusError> {
        self.bus.subscribe(topics::PRESENCE_PATTERN).await?;
        self.bus.subscribe(topics::NAME_PATTERN).await?;
        Ok(())
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Never fails. Messages that don't make sense are logged and dropped.
    pub fn handle_message(&self, message: &BusMessage) {
        debug!("Got message: {}: {:?}", message.topic, message.payload);
        match RobotEvent::from_message(message) {
            Ok(event) => self.handle_event(event),
            Err(BusError::UnexpectedTopic(topic)) => debug!("Ignoring message on {}", topic),
            Err(err) => warn!("Dropping message {:?}", err),
        }
    }

    pub fn handle_event(&self, event: RobotEvent) {
        match event {
            RobotEvent::Presence { id, online } => self.on_presence(id, online),
            RobotEvent::Name { id, raw } => self.on_name(id, &raw),
        }
    }

    fn on_presence(&self, id: String, online: bool) {
        info!(robot = %id, online, "Robot presence changed");
        // clock is read under the lock so concurrent handlers can't regress last_seen
        let mut registry = self.registry();
        let last_seen = online.then(Utc::now);
        registry.last_seen.insert(id, last_seen);
    }

    fn on_name(&self, id: String, raw: &[u8]) {
        let name = decode_name(raw).unwrap_or_else(|err| {
            warn!(robot = %id, "Robot name {:?} can't be decoded {}", raw, err);
            UNDECODABLE_NAME.to_owned()
        });
        info!(robot = %id, "Robot name is {:?}", name);
        self.registry().names.insert(id, name);
    }

    /// All robots that ever announced presence, sorted by id.
    pub fn robots(&self) -> impl Iterator<Item = Robot> {
        let registry = self.registry();
        let robots: Vec<Robot> = registry
            .last_seen
            .keys()
            .filter_map(|id| registry.snapshot(id, &self.bus))
            .collect();
        robots.into_iter()
    }

    pub fn robot(&self, id: &str) -> Result<Robot, RobotError> {
        self.registry()
            .snapshot(id, &self.bus)
            .ok_or_else(|| RobotError::NotFound(id.to_owned()))
    }
}

/// Strict ascii decoding.
pub fn decode_name(raw: &[u8]) -> Result<String, RobotError> {
    if !raw.is_ascii() {
        return Err(RobotError::Decode);
    }
    String::from_utf8(raw.to_vec()).map_err(|_| RobotError::Decode)
}

/// Applies inbound bus messages to the registry in delivery order.
pub fn start_event_dispatch(
    robot_group: Arc<RobotGroup>,
    mut receiver: mpsc::Receiver<BusMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = receiver.recv().await {
            robot_group.handle_message(&message);
        }
        warn!("Bus message channel closed");
    })
}
