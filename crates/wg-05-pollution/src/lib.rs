//! # Pollution Aggregator Subsystem
//!
//! The telemetry pipeline of one plant: a simulated CO₂ sensor feeds a
//! drainable buffer, an aggregator folds the buffer into an overlapping
//! sliding window (8 measurements per average, discard 4, so every reading
//! contributes to at most two windows), and a publisher ships the
//! accumulated averages as one batch every publish period.
//!
//! The pipeline is independent of the market side of the plant; it only
//! needs a [`BatchSink`] to push batches through.

pub mod buffer;
pub mod pipeline;
pub mod window;

pub use buffer::MeasurementBuffer;
pub use pipeline::{BatchSink, PollutionConfig, PollutionPipeline, SinkError};
pub use window::{AverageStore, SlidingWindow};
