use crate::{error::RobotError, robot::Robot, robot_group::RobotGroup};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{collections::HashMap, convert::Infallible, net::SocketAddr, sync::Arc};
use tokio::task::JoinHandle;
use tracing::*;
use warp::{hyper::StatusCode, Filter, Rejection, Reply};

const INDEX_PAGE: &str = include_str!("../static/index.html");
const JOYSTICK_PAGE: &str = include_str!("../static/joystick.html");

#[derive(Debug, Serialize)]
pub struct RobotView {
    pub id: String,
    pub name: String,
    pub online: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub status: String,
    pub color: &'static str,
}

impl From<&Robot> for RobotView {
    fn from(robot: &Robot) -> Self {
        let liveness = robot.liveness();
        Self {
            id: robot.id().to_owned(),
            name: robot.name().to_owned(),
            online: robot.online(),
            last_seen: robot.last_seen(),
            status: liveness.label(),
            color: liveness.color(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CommandError {
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("field {0} is not a number")]
    NotANumber(&'static str),
    #[error(transparent)]
    Robot(#[from] RobotError),
}

impl CommandError {
    fn status(&self) -> StatusCode {
        match self {
            CommandError::MissingField(_) | CommandError::NotANumber(_) => StatusCode::BAD_REQUEST,
            CommandError::Robot(RobotError::NotFound(_)) => StatusCode::NOT_FOUND,
            CommandError::Robot(RobotError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            CommandError::Robot(RobotError::Transport(_)) => StatusCode::BAD_GATEWAY,
            CommandError::Robot(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_reply(self) -> Box<dyn Reply> {
        let status = self.status();
        Box::new(warp::reply::with_status(self.to_string(), status))
    }
}

/// Form posted by the joystick page.
#[derive(Debug, Clone, Copy, PartialEq)]
enum DriveRequest {
    Motors { left: f64, right: f64 },
    Direction { degree: f64, distance: f64 },
}

impl DriveRequest {
    fn from_form(form: &HashMap<String, String>) -> Result<Self, CommandError> {
        if form.contains_key("left") && form.contains_key("right") {
            Ok(DriveRequest::Motors {
                left: number_field(form, "left")?,
                right: number_field(form, "right")?,
            })
        } else {
            Ok(DriveRequest::Direction {
                degree: number_field(form, "degree")?,
                distance: number_field(form, "distance")?,
            })
        }
    }
}

fn number_field(form: &HashMap<String, String>, field: &'static str) -> Result<f64, CommandError> {
    form.get(field)
        .ok_or(CommandError::MissingField(field))?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or(CommandError::NotANumber(field))
}

async fn drive(
    robot_id: String,
    form: HashMap<String, String>,
    robot_group: Arc<RobotGroup>,
) -> Result<Box<dyn Reply>, Infallible> {
    let result = async {
        let robot = robot_group.robot(&robot_id)?;
        match DriveRequest::from_form(&form)? {
            DriveRequest::Motors { left, right } => robot.set_motors(left, right).await?,
            DriveRequest::Direction { degree, distance } => {
                robot.set_direction(degree, distance).await?
            }
        }
        Ok::<_, CommandError>(())
    }
    .await;

    match result {
        Ok(()) => Ok(Box::new("OK")),
        Err(err) => {
            warn!(robot = %robot_id, "Drive command failed {}", err);
            Ok(err.into_reply())
        }
    }
}

fn with_robot_group(
    robot_group: Arc<RobotGroup>,
) -> impl Filter<Extract = (Arc<RobotGroup>,), Error = Infallible> + Clone {
    warp::any().map(move || robot_group.clone())
}

pub fn routes(
    robot_group: Arc<RobotGroup>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let index = warp::get()
        .and(warp::path::end().or(warp::path!("robot")).unify())
        .map(|| warp::reply::html(INDEX_PAGE));

    let robot_list = warp::get()
        .and(warp::path!("api" / "robots"))
        .and(with_robot_group(robot_group.clone()))
        .map(|robot_group: Arc<RobotGroup>| {
            let robots: Vec<RobotView> = robot_group
                .robots()
                .map(|robot| RobotView::from(&robot))
                .collect();
            warp::reply::json(&robots)
        });

    let joystick = warp::get()
        .and(warp::path!("robot" / String))
        .and(with_robot_group(robot_group.clone()))
        .map(
            |robot_id: String, robot_group: Arc<RobotGroup>| -> Box<dyn Reply> {
                match robot_group.robot(&robot_id) {
                    Ok(_) => Box::new(warp::reply::html(JOYSTICK_PAGE)),
                    Err(err) => CommandError::from(err).into_reply(),
                }
            },
        );

    let drive_command = warp::post()
        .and(warp::path!("robot" / String))
        .and(warp::body::form())
        .and(with_robot_group(robot_group))
        .and_then(drive);

    index.or(robot_list).or(joystick).or(drive_command)
}

pub fn start_web_server(address: SocketAddr, robot_group: Arc<RobotGroup>) -> JoinHandle<()> {
    info!("Web server listening on {}", address);
    tokio::spawn(warp::serve(routes(robot_group)).run(address))
}
