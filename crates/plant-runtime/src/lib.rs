//! # Plant Runtime
//!
//! Everything that turns the subsystem crates into one running power-plant
//! process: configuration loading, registration with the administration
//! service, subsystem wiring, the event pumps and the startup/shutdown
//! sequence.
//!
//! ## Startup order
//!
//! 1. Bind the peer RPC server (an occupied port is a distinct, retryable
//!    error for the operator prompt)
//! 2. Register over HTTP and seed the plant directory with the response
//! 3. Start the broker intake and the pollution pipeline
//! 4. Start the event pumps
//! 5. Announce presence to every plant learned at registration, evicting
//!    the unreachable ones
//!
//! Shutdown walks the same list backwards.

pub mod adapters;
pub mod admin_client;
pub mod config;
pub mod node;

pub use admin_client::{AdminClient, AdminError};
pub use config::{ConfigError, PlantConfig};
pub use node::{PlantNode, StartupError};
