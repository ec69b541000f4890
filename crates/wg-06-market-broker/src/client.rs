//! The per-process MQTT connection.

use parking_lot::Mutex;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Broker connectivity failures.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("invalid broker url {0:?}")]
    InvalidUrl(String),
    #[error("broker client error: {0}")]
    Client(#[from] rumqttc::ClientError),
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Connection settings for one process.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// `tcp://host:port` style URI.
    pub url: String,
    /// Unique per process; plants use `plant-<id>`.
    pub client_id: String,
}

/// Split a `tcp://host:port` URI into host and port.
pub fn parse_broker_url(url: &str) -> Result<(String, u16), BrokerError> {
    let rest = url
        .strip_prefix("tcp://")
        .or_else(|| url.strip_prefix("mqtt://"))
        .unwrap_or(url);
    let (host, port) = rest
        .rsplit_once(':')
        .ok_or_else(|| BrokerError::InvalidUrl(url.to_string()))?;
    if host.is_empty() {
        return Err(BrokerError::InvalidUrl(url.to_string()));
    }
    let port: u16 = port
        .parse()
        .map_err(|_| BrokerError::InvalidUrl(url.to_string()))?;
    Ok((host.to_string(), port))
}

type Routes = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Vec<u8>>>>>;

/// One MQTT connection, shared by every adapter in the process.
///
/// Incoming publishes are routed to the channel registered for their topic.
/// The event-loop task polls forever: a connection error is logged and
/// polling resumes after a short pause, which makes rumqttc redial; the
/// session is not cleaned, so the broker keeps QoS 2 subscriptions across
/// reconnects.
pub struct BrokerClient {
    client: AsyncClient,
    routes: Routes,
    event_loop: JoinHandle<()>,
}

impl BrokerClient {
    pub fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let (host, port) = parse_broker_url(&config.url)?;
        let mut options = MqttOptions::new(config.client_id.clone(), host, port);
        options.set_keep_alive(Duration::from_secs(30));
        options.set_clean_session(false);

        let (client, event_loop) = AsyncClient::new(options, 64);
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        let event_loop = tokio::spawn(Self::drive(event_loop, Arc::clone(&routes)));

        info!(url = %config.url, client_id = %config.client_id, "Broker client started");
        Ok(Self {
            client,
            routes,
            event_loop,
        })
    }

    /// Subscribe at QoS 2 and receive raw payloads for `topic`.
    pub async fn subscribe_raw(
        &self,
        topic: &str,
    ) -> Result<mpsc::UnboundedReceiver<Vec<u8>>, BrokerError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.lock().insert(topic.to_string(), tx);
        self.client.subscribe(topic, QoS::ExactlyOnce).await?;
        info!(topic, "Subscribed");
        Ok(rx)
    }

    /// Publish a JSON payload at QoS 2 (exactly-once).
    pub async fn publish_json<T: Serialize>(
        &self,
        topic: &str,
        value: &T,
    ) -> Result<(), BrokerError> {
        let payload = serde_json::to_vec(value)?;
        self.client
            .publish(topic, QoS::ExactlyOnce, false, payload)
            .await?;
        Ok(())
    }

    /// Disconnect and stop the event-loop task.
    pub async fn shutdown(&self) {
        let _ = self.client.disconnect().await;
        self.event_loop.abort();
        debug!("Broker client stopped");
    }

    async fn drive(mut event_loop: EventLoop, routes: Routes) {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let route = routes.lock().get(&publish.topic).cloned();
                    match route {
                        Some(tx) => {
                            if tx.send(publish.payload.to_vec()).is_err() {
                                debug!(topic = %publish.topic, "Subscriber gone, dropping payload");
                            }
                        }
                        None => debug!(topic = %publish.topic, "No route for topic"),
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(%error, "Broker connection error, reconnecting");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tcp_url() {
        assert_eq!(
            parse_broker_url("tcp://broker.local:1883").unwrap(),
            ("broker.local".to_string(), 1883),
        );
    }

    #[test]
    fn test_parse_bare_host_port() {
        assert_eq!(
            parse_broker_url("127.0.0.1:1883").unwrap(),
            ("127.0.0.1".to_string(), 1883),
        );
    }

    #[test]
    fn test_parse_rejects_missing_port() {
        assert!(matches!(
            parse_broker_url("tcp://broker.local"),
            Err(BrokerError::InvalidUrl(_)),
        ));
    }

    #[test]
    fn test_parse_rejects_bad_port_and_empty_host() {
        assert!(parse_broker_url("tcp://broker.local:http").is_err());
        assert!(parse_broker_url("tcp://:1883").is_err());
    }
}
