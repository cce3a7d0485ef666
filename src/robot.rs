use crate::{
    bus::MessageBus,
    error::RobotError,
    speed_table::{SpeedTable, WheelSpeeds},
    topics,
};
use chrono::{DateTime, Duration, Utc};
use std::{fmt, sync::Arc};
use tracing::*;

pub const UNNAMED: &str = "Unnamed";

/// Wire format of a motor command. Speeds are truncated toward zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorCommand {
    pub left: i64,
    pub right: i64,
}

impl MotorCommand {
    pub fn from_speeds(left: f64, right: f64) -> Self {
        Self {
            left: left.trunc() as i64,
            right: right.trunc() as i64,
        }
    }
}

impl From<WheelSpeeds> for MotorCommand {
    fn from(speeds: WheelSpeeds) -> Self {
        MotorCommand::from_speeds(speeds.left, speeds.right)
    }
}

impl fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.left, self.right)
    }
}

/// How recently a robot was heard from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    SeenMinutesAgo(i64),
    ProbablyDisconnected,
    Disconnected,
}

const ALIVE_WINDOW_SECS: i64 = 60;
const RECENT_WINDOW_MINUTES: i64 = 30;

impl Liveness {
    pub fn classify(last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let Some(last_seen) = last_seen else {
            return Liveness::Disconnected;
        };
        let delta = now - last_seen;
        if delta < Duration::seconds(ALIVE_WINDOW_SECS) {
            Liveness::Alive
        } else if delta < Duration::minutes(RECENT_WINDOW_MINUTES) {
            Liveness::SeenMinutesAgo(delta.num_minutes())
        } else {
            Liveness::ProbablyDisconnected
        }
    }

    pub fn label(&self) -> String {
        match self {
            Liveness::Alive => String::from("alive"),
            Liveness::SeenMinutesAgo(minutes) => format!("before {} minutes", minutes),
            Liveness::ProbablyDisconnected => String::from("disconnected (probably)"),
            Liveness::Disconnected => String::from("disconnected"),
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Liveness::Alive => "#20FF20",
            Liveness::SeenMinutesAgo(_) => "#008000",
            Liveness::ProbablyDisconnected | Liveness::Disconnected => "#FFFFFF",
        }
    }
}

/// Snapshot of one robot taken from the registry.
///
/// Changing a snapshot does not touch the registry. Commands go straight to the bus.
#[derive(Clone)]
pub struct Robot {
    id: String,
    name: Option<String>,
    last_seen: Option<DateTime<Utc>>,
    bus: Arc<dyn MessageBus>,
}

impl Robot {
    pub fn new(
        id: String,
        name: Option<String>,
        last_seen: Option<DateTime<Utc>>,
        bus: Arc<dyn MessageBus>,
    ) -> Self {
        Self {
            id,
            name,
            last_seen,
            bus,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNNAMED)
    }

    pub fn last_seen(&self) -> Option<DateTime<Utc>> {
        self.last_seen
    }

    pub fn online(&self) -> bool {
        self.last_seen.is_some()
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness_at(Utc::now())
    }

    pub fn liveness_at(&self, now: DateTime<Utc>) -> Liveness {
        Liveness::classify(self.last_seen, now)
    }

    /// `direction` in degrees, `speed` from 0 to 100.
    pub async fn set_direction(&self, direction: f64, speed: f64) -> Result<(), RobotError> {
        let speeds = SpeedTable::global().from_angle(direction, speed)?;
        self.set_motors(speeds.left, speeds.right).await
    }

    pub async fn set_motors(&self, left: f64, right: f64) -> Result<(), RobotError> {
        let command = MotorCommand::from_speeds(left, right);
        info!(robot = %self.id, "left={} right={}", command.left, command.right);
        self.bus
            .publish(&topics::motors_topic(&self.id), command.to_string())
            .await
            .map_err(|err| {
                error!(robot = %self.id, "Failed to publish motor command {:?}", err);
                RobotError::from(err)
            })
    }
}

impl fmt::Debug for Robot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Robot")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("last_seen", &self.last_seen)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{memory::MemoryBus, BusMessage};

    fn robot_with_bus(last_seen: Option<DateTime<Utc>>) -> (Robot, MemoryBus) {
        let (bus, _receiver) = MemoryBus::new();
        let robot = Robot::new("r1".to_owned(), None, last_seen, Arc::new(bus.clone()));
        (robot, bus)
    }

    #[test]
    fn truncates_toward_zero() {
        let command = MotorCommand::from_speeds(3.9, -3.9);
        assert_eq!(command, MotorCommand { left: 3, right: -3 });
        assert_eq!(command.to_string(), "3,-3");
    }

    #[test]
    fn negative_fraction_is_zero() {
        assert_eq!(MotorCommand::from_speeds(-0.5, 0.99).to_string(), "0,0");
    }

    #[tokio::test]
    async fn set_motors_publishes_payload() {
        let (robot, bus) = robot_with_bus(None);
        robot.set_motors(3.9, -3.9).await.unwrap();
        assert_eq!(
            bus.published(),
            vec![BusMessage::new("/robot/r1/motors", "3,-3")]
        );
    }

    #[tokio::test]
    async fn set_direction_uses_speed_table() {
        let (robot, bus) = robot_with_bus(None);
        robot.set_direction(90.0, 50.0).await.unwrap();
        robot.set_direction(67.5, 50.0).await.unwrap();
        let payloads: Vec<_> = bus
            .published()
            .into_iter()
            .map(|message| message.payload)
            .collect();
        assert_eq!(payloads, vec!["50,-50", "50,-25"]);
    }

    #[tokio::test]
    async fn set_direction_rejects_bad_angle() {
        let (robot, bus) = robot_with_bus(None);
        let result = robot.set_direction(400.0, 50.0).await;
        assert!(matches!(result, Err(RobotError::InvalidInput(_))));
        assert!(bus.published().is_empty());
    }

    #[test]
    fn name_falls_back_to_unnamed() {
        let (robot, bus) = robot_with_bus(None);
        assert_eq!(robot.name(), UNNAMED);
        let named = Robot::new(
            "r1".to_owned(),
            Some("Rover".to_owned()),
            None,
            Arc::new(bus),
        );
        assert_eq!(named.name(), "Rover");
    }

    #[test]
    fn liveness_buckets() {
        let now = Utc::now();
        let classify = |seconds_ago: i64| {
            Liveness::classify(Some(now - Duration::seconds(seconds_ago)), now)
        };
        assert_eq!(classify(5), Liveness::Alive);
        assert_eq!(classify(59), Liveness::Alive);
        assert_eq!(classify(60), Liveness::SeenMinutesAgo(1));
        assert_eq!(classify(5 * 60 + 30), Liveness::SeenMinutesAgo(5));
        assert_eq!(classify(30 * 60), Liveness::ProbablyDisconnected);
        assert_eq!(Liveness::classify(None, now), Liveness::Disconnected);
    }

    #[test]
    fn liveness_labels_and_colors() {
        assert_eq!(Liveness::Alive.label(), "alive");
        assert_eq!(Liveness::Alive.color(), "#20FF20");
        assert_eq!(Liveness::SeenMinutesAgo(4).label(), "before 4 minutes");
        assert_eq!(Liveness::SeenMinutesAgo(4).color(), "#008000");
        assert_eq!(
            Liveness::ProbablyDisconnected.label(),
            "disconnected (probably)"
        );
        assert_eq!(Liveness::Disconnected.label(), "disconnected");
        assert_eq!(Liveness::Disconnected.color(), "#FFFFFF");
    }

    #[test]
    fn online_follows_last_seen() {
        let (robot, _bus) = robot_with_bus(Some(Utc::now()));
        assert!(robot.online());
        assert_eq!(robot.liveness(), Liveness::Alive);
        let (robot, _bus) = robot_with_bus(None);
        assert!(!robot.online());
    }
}
