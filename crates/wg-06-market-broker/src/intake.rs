//! Energy-request intake.

use crate::client::{BrokerClient, BrokerError};
use crate::codec::decode_request;
use shared_types::EnergyRequest;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Subscribe to the energy-request topic and pump valid requests into the
/// returned channel.
///
/// The pump only deserializes and validates: per the concurrency rules it
/// never performs outbound RPC, it hands requests to whoever consumes the
/// channel (the election manager, via the runtime). The pump ends when the
/// broker connection or the consumer goes away.
pub async fn spawn_request_intake(
    broker: &BrokerClient,
    topic: &str,
) -> Result<(mpsc::UnboundedReceiver<EnergyRequest>, JoinHandle<()>), BrokerError> {
    let mut raw = broker.subscribe_raw(topic).await?;
    let (tx, rx) = mpsc::unbounded_channel();
    let topic = topic.to_string();

    let pump = tokio::spawn(async move {
        while let Some(payload) = raw.recv().await {
            if let Some(request) = decode_request(&payload) {
                debug!(
                    topic = %topic,
                    request_id = %request.request_id,
                    amount_kwh = request.amount_kwh,
                    "Energy request received"
                );
                if tx.send(request).is_err() {
                    break;
                }
            }
        }
        debug!(topic = %topic, "Request intake pump stopped");
    });

    Ok((rx, pump))
}
