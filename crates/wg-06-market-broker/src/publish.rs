//! Outbound publishers.

use crate::client::{BrokerClient, BrokerError};
use async_trait::async_trait;
use shared_types::{EnergyRequest, PollutionBatch};
use std::sync::Arc;
use tracing::debug;
use wg_05_pollution::{BatchSink, SinkError};

/// Publishes pollution batches over the broker; the sink the pollution
/// pipeline is wired to in a real plant process.
pub struct BrokerBatchSink {
    broker: Arc<BrokerClient>,
    topic: String,
}

impl BrokerBatchSink {
    pub fn new(broker: Arc<BrokerClient>, topic: impl Into<String>) -> Self {
        Self {
            broker,
            topic: topic.into(),
        }
    }
}

#[async_trait]
impl BatchSink for BrokerBatchSink {
    async fn publish(&self, batch: PollutionBatch) -> Result<(), SinkError> {
        self.broker
            .publish_json(&self.topic, &batch)
            .await
            .map_err(|e| SinkError(e.to_string()))
    }
}

/// Publishes energy requests; used by the renewable-energy provider.
pub struct RequestPublisher {
    broker: Arc<BrokerClient>,
    topic: String,
}

impl RequestPublisher {
    pub fn new(broker: Arc<BrokerClient>, topic: impl Into<String>) -> Self {
        Self {
            broker,
            topic: topic.into(),
        }
    }

    pub async fn publish(&self, request: &EnergyRequest) -> Result<(), BrokerError> {
        debug!(
            topic = %self.topic,
            request_id = %request.request_id,
            amount_kwh = request.amount_kwh,
            "Broadcasting energy request"
        );
        self.broker.publish_json(&self.topic, request).await
    }
}
