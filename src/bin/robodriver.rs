use anyhow::Result;
use clap::Parser;
use robodriver::{
    bus::{memory::MemoryBus, mqtt::MqttBus, zenoh_bus::ZenohBus, BusMessage, MessageBus},
    configuration::{AppConfig, BusKind},
    logging,
    robot_group::{start_event_dispatch, RobotGroup},
    speed_table::SpeedTable,
    web::start_web_server,
};
use std::{path::PathBuf, sync::Arc};
use tokio::sync::mpsc;
use tracing::*;

#[derive(Parser, Debug)]
#[command(version, about = "Drive a fleet of robots from the browser")]
struct Args {
    /// path to config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sets the level of verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbosity: u8,

    /// Log as json
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::setup_tracing(args.verbosity, args.json_logs);

    let app_config = AppConfig::load_config(&args.config)?;

    SpeedTable::global();
    info!("Speed table ready");

    let (bus, receiver): (Arc<dyn MessageBus>, mpsc::Receiver<BusMessage>) = match app_config.bus
    {
        BusKind::Mqtt => {
            let (bus, receiver) = MqttBus::connect(&app_config.mqtt);
            (Arc::new(bus), receiver)
        }
        BusKind::Zenoh => {
            let (bus, receiver) = ZenohBus::connect(&app_config.zenoh).await?;
            (Arc::new(bus), receiver)
        }
        BusKind::Memory => {
            warn!("Using in memory bus. No robot will be able to connect");
            let (bus, receiver) = MemoryBus::new();
            (Arc::new(bus), receiver)
        }
    };

    let robot_group = Arc::new(RobotGroup::new(bus));
    robot_group.subscribe().await?;
    start_event_dispatch(robot_group.clone(), receiver);

    start_web_server(app_config.web.address(), robot_group);

    tokio::signal::ctrl_c().await?;
    info!("Exiting");

    Ok(())
}
