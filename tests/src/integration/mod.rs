//! Cross-subsystem choreography scenarios.

mod market;
mod telemetry;
