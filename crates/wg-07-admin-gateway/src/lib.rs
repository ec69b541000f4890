//! # Administration Gateway
//!
//! The central administration service: plants register here at startup, the
//! operator CLI lists them, and pollution batches arriving over the broker
//! feed the CO₂ range statistics.
//!
//! ## HTTP surface
//!
//! - `POST /plants` - register; `201` with the previously-registered list,
//!   `409` on a duplicate id, `400` on an invalid body
//! - `GET /plants` - full list
//! - `GET /plants/{id}` - one plant or `404`
//! - `GET /statistics/co2/average?t1=..&t2=..` - mean over every plant-level
//!   average whose batch timestamp falls in `[t1, t2]`; `400` when the range
//!   is inverted, `404` when nothing matches

pub mod ingest;
pub mod router;
pub mod state;

pub use ingest::spawn_pollution_ingest;
pub use router::router;
pub use state::AdminState;
