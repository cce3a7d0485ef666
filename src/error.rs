use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BusError {
    #[error("mqtt client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),
    #[error("zenoh error {0:?}")]
    Zenoh(zenoh::Error),
    #[error("malformed payload {payload:?} on topic {topic}")]
    MalformedPayload { topic: String, payload: String },
    #[error("topic {0} does not match any robot pattern")]
    UnexpectedTopic(String),
    #[error("bus connection closed")]
    Closed,
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RobotError {
    #[error("angle {0} is outside of the calibrated range 0..=360")]
    InvalidInput(f64),
    #[error("robot {0:?} not found")]
    NotFound(String),
    #[error("name payload is not valid ascii")]
    Decode,
    #[error("transport error: {0}")]
    Transport(#[from] BusError),
}
