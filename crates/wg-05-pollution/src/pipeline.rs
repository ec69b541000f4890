//! The sensor / aggregator / publisher task trio.

use crate::buffer::MeasurementBuffer;
use crate::window::{AverageStore, SlidingWindow};
use async_trait::async_trait;
use rand::Rng;
use shared_types::{epoch_millis, Measurement, PollutionBatch};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Publishing a batch failed downstream.
#[derive(Debug, Clone, Error)]
#[error("pollution publish failed: {0}")]
pub struct SinkError(pub String);

/// Where completed batches go; the runtime wires this to the broker.
#[async_trait]
pub trait BatchSink: Send + Sync {
    async fn publish(&self, batch: PollutionBatch) -> Result<(), SinkError>;
}

/// Cadences and sensor shape of the pipeline.
#[derive(Debug, Clone)]
pub struct PollutionConfig {
    /// How often the simulated sensor produces a reading.
    pub sensor_period: Duration,
    /// How often the aggregator drains the buffer into the window.
    pub aggregate_period: Duration,
    /// How often accumulated averages are published as one batch.
    pub publish_period: Duration,
    pub window_size: usize,
    pub window_discard: usize,
    /// Baseline CO₂ level of the simulated sensor, ppm.
    pub base_level: f64,
    /// Uniform jitter applied around the baseline.
    pub jitter: f64,
}

impl Default for PollutionConfig {
    fn default() -> Self {
        Self {
            sensor_period: Duration::from_millis(200),
            aggregate_period: Duration::from_secs(1),
            publish_period: Duration::from_secs(10),
            window_size: SlidingWindow::DEFAULT_WINDOW_SIZE,
            window_discard: SlidingWindow::DEFAULT_DISCARD,
            base_level: 390.0,
            jitter: 35.0,
        }
    }
}

/// Handle over the three running tasks.
pub struct PollutionPipeline {
    stop: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl PollutionPipeline {
    /// Start sensor, aggregator and publisher for one plant.
    pub fn spawn(plant_id: u64, sink: Arc<dyn BatchSink>, config: PollutionConfig) -> Self {
        let buffer = Arc::new(MeasurementBuffer::new());
        let averages = Arc::new(AverageStore::new());
        let (stop, _) = watch::channel(false);

        let tasks = vec![
            Self::spawn_sensor(config.clone(), Arc::clone(&buffer), stop.subscribe()),
            Self::spawn_aggregator(
                config.clone(),
                Arc::clone(&buffer),
                Arc::clone(&averages),
                stop.subscribe(),
            ),
            Self::spawn_publisher(plant_id, config, sink, averages, stop.subscribe()),
        ];

        info!(plant_id, "Pollution pipeline started");
        Self { stop, tasks }
    }

    /// Signal all three tasks and wait for them to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
        debug!("Pollution pipeline stopped");
    }

    fn spawn_sensor(
        config: PollutionConfig,
        buffer: Arc<MeasurementBuffer>,
        mut stop: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(config.sensor_period);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let jitter = rand::thread_rng().gen_range(-config.jitter..=config.jitter);
                        buffer.push(Measurement::new(config.base_level + jitter, epoch_millis()));
                    }
                    _ = stop.changed() => break,
                }
            }
        })
    }

    fn spawn_aggregator(
        config: PollutionConfig,
        buffer: Arc<MeasurementBuffer>,
        averages: Arc<AverageStore>,
        mut stop: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut window = SlidingWindow::new(config.window_size, config.window_discard);
            let mut tick = tokio::time::interval(config.aggregate_period);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        averages.append(window.extend(buffer.drain()));
                    }
                    _ = stop.changed() => break,
                }
            }
        })
    }

    fn spawn_publisher(
        plant_id: u64,
        config: PollutionConfig,
        sink: Arc<dyn BatchSink>,
        averages: Arc<AverageStore>,
        mut stop: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(config.publish_period);
            // The first interval tick fires immediately; skip it so the
            // first batch covers a full period.
            tick.tick().await;
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        let batch_averages = averages.get_and_clear();
                        if batch_averages.is_empty() {
                            continue;
                        }
                        let batch =
                            PollutionBatch::new(plant_id, epoch_millis(), batch_averages);
                        debug!(
                            plant_id,
                            averages = batch.averages.len(),
                            "Publishing pollution batch"
                        );
                        if let Err(error) = sink.publish(batch).await {
                            // Dropped batches are not retried; the next
                            // period publishes fresh data.
                            warn!(plant_id, %error, "Pollution batch dropped");
                        }
                    }
                    _ = stop.changed() => break,
                }
            }
        })
    }
}
