use crate::error::BusError;
use config::Config;
use serde::Deserialize;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};
use tracing::*;

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub bus: BusKind,
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub zenoh: ZenohBusConfig,
    #[serde(default)]
    pub web: WebConfig,
}

impl AppConfig {
    pub fn load_config(config: &Option<PathBuf>) -> anyhow::Result<Self> {
        let settings = if let Some(config) = config {
            info!("Using configuration from {:?}", config);
            Config::builder()
                .add_source(config::File::with_name(
                    config
                        .to_str()
                        .ok_or_else(|| anyhow::anyhow!("Failed to convert path"))?,
                ))
                .add_source(config::Environment::with_prefix("APP").separator("__"))
                .build()?
        } else {
            info!("Using dev configuration");
            Config::builder()
                .add_source(config::File::with_name("config/settings"))
                .add_source(config::File::with_name("config/dev_settings").required(false))
                .add_source(config::Environment::with_prefix("APP").separator("__"))
                .build()?
        };

        Ok(settings.try_deserialize()?)
    }
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    #[default]
    Mqtt,
    Zenoh,
    Memory,
}

#[derive(Deserialize, Debug, Clone)]
pub struct MqttConfig {
    #[serde(default = "default_mqtt_host")]
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

fn default_mqtt_host() -> String {
    String::from("localhost")
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    String::from("robodriver")
}

fn default_keep_alive_secs() -> u64 {
    30
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_mqtt_host(),
            port: default_mqtt_port(),
            username: None,
            password: None,
            client_id: default_client_id(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ZenohBusConfig {
    #[serde(default)]
    pub connect: Vec<zenoh_config::EndPoint>,
    #[serde(default)]
    pub listen: Vec<zenoh_config::EndPoint>,
    #[serde(default)]
    pub config_path: Option<String>,
}

impl ZenohBusConfig {
    pub fn get_zenoh_config(&self) -> Result<zenoh::config::Config, BusError> {
        let mut config = if let Some(conf_file) = &self.config_path {
            zenoh::config::Config::from_file(conf_file).map_err(BusError::Zenoh)?
        } else {
            zenoh::config::Config::default()
        };
        if !self.connect.is_empty() {
            config.connect.endpoints.clone_from(&self.connect);
        }
        if !self.listen.is_empty() {
            config.listen.endpoints.clone_from(&self.listen);
        }
        Ok(config)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct WebConfig {
    #[serde(default = "default_listen")]
    pub listen: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_listen() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    5000
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
        }
    }
}

impl WebConfig {
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.listen, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static DEFAULT_CONFIG: &str = include_str!("../config/settings.yaml");

    fn parse(yaml: &str) -> AppConfig {
        Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize::<AppConfig>()
            .unwrap()
    }

    #[test]
    fn test_config() {
        let config = parse(DEFAULT_CONFIG);
        assert_eq!(config.bus, BusKind::Mqtt);
        assert_eq!(config.mqtt.port, 1883);
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let config = parse("bus: memory\n");
        assert_eq!(config.bus, BusKind::Memory);
        assert_eq!(config.mqtt.host, "localhost");
        assert!(config.mqtt.username.is_none());
        assert_eq!(config.web.address(), "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn credentials_are_optional_pair() {
        let config = parse(
            "mqtt:\n  host: broker.local\n  username: driver\n  password: secret\nweb:\n  listen: 127.0.0.1\n  port: 8080\n",
        );
        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.username.as_deref(), Some("driver"));
        assert_eq!(config.mqtt.password.as_deref(), Some("secret"));
        assert_eq!(config.web.address(), "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
    }
}
