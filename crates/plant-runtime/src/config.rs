//! Plant process configuration.
//!
//! Values come from three layers, later layers winning: built-in defaults,
//! an optional TOML file, and `WG_*` environment variables for the knobs
//! most often changed per process.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file {path} unreadable: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("configuration file {path} invalid: {source}")]
    Invalid {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Complete plant configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PlantConfig {
    pub plant: PlantSection,
    pub admin: AdminSection,
    pub mqtt: MqttSection,
    pub price: PriceSection,
    pub timing: TimingSection,
}

/// Identity of this plant process.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PlantSection {
    /// Plant id; 0 means "ask the operator".
    pub id: u64,
    /// Host peers use to reach this plant.
    pub address: String,
    /// Peer RPC port; 0 means "ask the operator".
    pub port: u16,
}

impl Default for PlantSection {
    fn default() -> Self {
        Self {
            id: 0,
            address: "localhost".into(),
            port: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AdminSection {
    pub server: AdminServerSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AdminServerSection {
    pub base_url: String,
}

impl Default for AdminServerSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MqttSection {
    pub broker: BrokerSection,
    pub topic: TopicSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BrokerSection {
    pub url: String,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            url: "tcp://localhost:1883".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TopicSection {
    pub energy_requests: String,
    pub pollution_publish: String,
}

impl Default for TopicSection {
    fn default() -> Self {
        Self {
            energy_requests: "wattgrid/energy-requests".into(),
            pollution_publish: "wattgrid/pollution".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PriceSection {
    pub min: f64,
    pub max: f64,
}

impl Default for PriceSection {
    fn default() -> Self {
        Self { min: 0.1, max: 0.9 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TimingSection {
    /// Deadline on every outbound peer RPC, seconds.
    pub rpc_deadline_secs: u64,
    /// Simulated production time per requested kWh, milliseconds.
    pub production_millis_per_kwh: u64,
    /// How long completed election state lingers, seconds.
    pub cleanup_delay_secs: u64,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            rpc_deadline_secs: 10,
            production_millis_per_kwh: 1,
            cleanup_delay_secs: 30,
        }
    }
}

impl PlantConfig {
    /// Load from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
                        path: path.display().to_string(),
                        source,
                    })?;
                toml::from_str(&raw).map_err(|source| ConfigError::Invalid {
                    path: path.display().to_string(),
                    source,
                })?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn rpc_deadline(&self) -> Duration {
        Duration::from_secs(self.timing.rpc_deadline_secs)
    }

    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_secs(self.timing.cleanup_delay_secs)
    }

    fn apply_env(&mut self) {
        if let Some(id) = env_parse("WG_PLANT_ID") {
            self.plant.id = id;
        }
        if let Some(port) = env_parse("WG_PLANT_PORT") {
            self.plant.port = port;
        }
        if let Ok(address) = std::env::var("WG_PLANT_ADDRESS") {
            self.plant.address = address;
        }
        if let Ok(url) = std::env::var("WG_ADMIN_BASE_URL") {
            self.admin.server.base_url = url;
        }
        if let Ok(url) = std::env::var("WG_MQTT_BROKER_URL") {
            self.mqtt.broker.url = url;
        }
        if let Ok(topic) = std::env::var("WG_TOPIC_ENERGY_REQUESTS") {
            self.mqtt.topic.energy_requests = topic;
        }
        if let Ok(topic) = std::env::var("WG_TOPIC_POLLUTION") {
            self.mqtt.topic.pollution_publish = topic;
        }
        if let Some(min) = env_parse("WG_PRICE_MIN") {
            self.price.min = min;
        }
        if let Some(max) = env_parse("WG_PRICE_MAX") {
            self.price.max = max;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let config = PlantConfig::default();
        assert_eq!(config.plant.id, 0);
        assert_eq!(config.admin.server.base_url, "http://localhost:8080");
        assert_eq!(config.price.min, 0.1);
        assert_eq!(config.price.max, 0.9);
        assert_eq!(config.timing.production_millis_per_kwh, 1);
    }

    #[test]
    fn test_partial_toml_keeps_defaults_elsewhere() {
        let parsed: PlantConfig = toml::from_str(
            r#"
            [plant]
            id = 7
            port = 4007

            [mqtt.broker]
            url = "tcp://broker.lan:1883"

            [mqtt.topic]
            energy-requests = "lab/requests"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.plant.id, 7);
        assert_eq!(parsed.plant.port, 4007);
        assert_eq!(parsed.mqtt.broker.url, "tcp://broker.lan:1883");
        assert_eq!(parsed.mqtt.topic.energy_requests, "lab/requests");
        assert_eq!(parsed.mqtt.topic.pollution_publish, "wattgrid/pollution");
        assert_eq!(parsed.admin.server.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let result: Result<PlantConfig, _> = toml::from_str("plant = 3");
        assert!(result.is_err());
    }
}
