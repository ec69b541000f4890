//! Pollution telemetry end to end: pipeline -> wire JSON -> gateway store.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use wg_05_pollution::{BatchSink, PollutionConfig, PollutionPipeline, SinkError};
use wg_06_market_broker::codec;
use wg_07_admin_gateway::AdminState;

/// Stands in for the broker leg: serializes each batch exactly as the
/// publisher would, decodes it exactly as the gateway ingest does, and
/// records it in the statistics store.
struct WireLoopSink {
    state: Arc<AdminState>,
}

#[async_trait]
impl BatchSink for WireLoopSink {
    async fn publish(
        &self,
        batch: shared_types::PollutionBatch,
    ) -> Result<(), SinkError> {
        let payload =
            serde_json::to_vec(&batch).map_err(|e| SinkError(e.to_string()))?;
        let decoded = codec::decode_batch(&payload)
            .ok_or_else(|| SinkError("gateway rejected the batch".into()))?;
        self.state.record_batch(decoded);
        Ok(())
    }
}

#[tokio::test]
async fn test_pipeline_batches_feed_the_co2_statistics() {
    let state = Arc::new(AdminState::new());
    let sink = Arc::new(WireLoopSink {
        state: Arc::clone(&state),
    });

    let config = PollutionConfig {
        sensor_period: Duration::from_millis(2),
        aggregate_period: Duration::from_millis(10),
        publish_period: Duration::from_millis(40),
        ..PollutionConfig::default()
    };
    let pipeline = PollutionPipeline::spawn(4, sink, config.clone());

    crate::harness::wait_for("a batch to reach the gateway store", || {
        state.co2_average(0, i64::MAX).is_some()
    })
    .await;
    pipeline.shutdown().await;

    // The fleet-wide average reflects the simulated sensor band.
    let average = state.co2_average(0, i64::MAX).unwrap();
    assert!(
        (config.base_level - config.jitter..=config.base_level + config.jitter)
            .contains(&average),
        "average {average} outside the sensor band"
    );

    // An interval before any batch existed has no data.
    assert_eq!(state.co2_average(0, 1), None);
}
