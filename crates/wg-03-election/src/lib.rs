//! # Election Manager Subsystem
//!
//! Runs one independent ring election per energy request and coordinates the
//! outcome with the request processor.
//!
//! The algorithm is Chang-Roberts over the logical ring derived by the plant
//! registry: every idle plant that learns about a request starts its own
//! token carrying its bid; a plant forwards exactly the tokens it cannot
//! beat and discards the rest, so only the best-bidding initiator's token
//! survives a full traversal. The initiator that sees its own token again
//! has won, fulfills (or not) and circulates a winner announcement that
//! terminates back at itself.
//!
//! ## Architecture
//!
//! - **Domain layer:** bid pricing, per-request election state with its
//!   one-way winner latch, and the pure token-step decision
//! - **Ports layer:** traits for the registry view, the request processor
//!   and the peer courier, so the manager stays free of transport and
//!   wiring concerns
//! - **Service layer:** [`ElectionManager`], the event-driven coordinator

pub mod domain;
pub mod manager;
pub mod ports;

pub use domain::{ElectionState, Participation, PriceBand, TokenAction};
pub use manager::ElectionManager;
pub use ports::{CourierError, Dispatcher, PeerCourier, RingView};
