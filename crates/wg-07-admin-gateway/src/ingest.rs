//! Broker-side pollution ingest.

use crate::state::AdminState;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;
use wg_06_market_broker::{codec, BrokerClient, BrokerError};

/// Subscribe to the pollution topic and append every valid batch to the
/// statistics store.
pub async fn spawn_pollution_ingest(
    broker: &BrokerClient,
    topic: &str,
    state: Arc<AdminState>,
) -> Result<JoinHandle<()>, BrokerError> {
    let mut raw = broker.subscribe_raw(topic).await?;
    let topic = topic.to_string();

    Ok(tokio::spawn(async move {
        while let Some(payload) = raw.recv().await {
            if let Some(batch) = codec::decode_batch(&payload) {
                state.record_batch(batch);
            }
        }
        debug!(topic = %topic, "Pollution ingest stopped");
    }))
}
