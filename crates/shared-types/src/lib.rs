//! # Shared Types - Domain Entities for the Energy Market
//!
//! Defines the entities every subsystem agrees on:
//!
//! - **Membership**: [`PlantInfo`]
//! - **Market**: [`EnergyRequest`], [`Bid`]
//! - **Election wire values**: [`ElectionToken`], [`WinnerAnnouncement`]
//! - **Pollution telemetry**: [`Measurement`], [`PollutionBatch`]
//!
//! All wire-crossing types serialize as camelCase JSON so the broker payloads
//! and the administration HTTP bodies stay readable from any client.

pub mod entities;
pub mod time;

pub use entities::{
    Bid, ElectionToken, EnergyRequest, Measurement, PlantInfo, PollutionBatch,
    WinnerAnnouncement,
};
pub use time::epoch_millis;
