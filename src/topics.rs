//! Topic layout shared with the robot firmware.
//!
//! ```text
//! /robot/<id>/$online$   "0" when offline, any other integer when online
//! /robot/<id>/$name$     display name, ascii
//! /robot/<id>/motors     "<left>,<right>"
//! ```

use crate::{bus::BusMessage, error::BusError};
use bytes::Bytes;

pub const PRESENCE_PATTERN: &str = "/robot/+/$online$";
pub const NAME_PATTERN: &str = "/robot/+/$name$";

const ROBOT_LEVEL: &str = "robot";
const PRESENCE_LEVEL: &str = "$online$";
const NAME_LEVEL: &str = "$name$";

pub fn motors_topic(robot_id: &str) -> String {
    format!("/{}/{}/motors", ROBOT_LEVEL, robot_id)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotEvent {
    Presence { id: String, online: bool },
    Name { id: String, raw: Bytes },
}

impl RobotEvent {
    pub fn from_message(message: &BusMessage) -> Result<Self, BusError> {
        let unexpected = || BusError::UnexpectedTopic(message.topic.clone());
        let levels: Vec<&str> = message.topic.split('/').collect();
        let (id, kind) = match levels.as_slice() {
            ["", ROBOT_LEVEL, id, kind] if !id.is_empty() => (id.to_string(), *kind),
            _ => return Err(unexpected()),
        };

        match kind {
            PRESENCE_LEVEL => {
                let state = std::str::from_utf8(&message.payload)
                    .ok()
                    .and_then(|text| text.trim().parse::<i64>().ok())
                    .ok_or_else(|| BusError::MalformedPayload {
                        topic: message.topic.clone(),
                        payload: String::from_utf8_lossy(&message.payload).into_owned(),
                    })?;
                Ok(RobotEvent::Presence {
                    id,
                    online: state != 0,
                })
            }
            NAME_LEVEL => Ok(RobotEvent::Name {
                id,
                raw: message.payload.clone(),
            }),
            _ => Err(unexpected()),
        }
    }
}

/// Mqtt wildcard matching. `+` matches one level, `#` matches the rest.
pub fn matches(pattern: &str, topic: &str) -> bool {
    let mut pattern_levels = pattern.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (pattern_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(pattern), Some(topic)) if pattern == topic => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Zenoh key expressions can't start with `/` and reserve `$`.
///
/// `/robot/+/$online$` becomes `robot/*/online`.
pub fn to_key_expr(pattern: &str) -> String {
    pattern
        .trim_start_matches('/')
        .split('/')
        .map(|level| match level {
            "+" => "*",
            "#" => "**",
            literal => literal.trim_matches('$'),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Rebuild the canonical topic for a zenoh key received on a subscription to `pattern`.
pub fn topic_from_key_expr(pattern: &str, key: &str) -> Option<String> {
    let (leading, levels) = match pattern.strip_prefix('/') {
        Some(rest) => ("/", rest),
        None => ("", pattern),
    };
    let mut chunks = key.split('/');
    let mut topic = Vec::new();
    for level in levels.split('/') {
        match level {
            "#" => {
                topic.extend(chunks.by_ref());
                break;
            }
            "+" => topic.push(chunks.next()?),
            literal => {
                if chunks.next()? != literal.trim_matches('$') {
                    return None;
                }
                topic.push(literal);
            }
        }
    }
    if chunks.next().is_some() {
        return None;
    }
    Some(format!("{}{}", leading, topic.join("/")))
}
