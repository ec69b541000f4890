//! # Plant Registry Subsystem
//!
//! Maintains the membership view of a single plant process: itself plus every
//! other plant it knows about, and the deterministic logical ring derived
//! from that set.
//!
//! ## Architecture
//!
//! - **Domain layer:** pure ring ordering and successor lookup over an
//!   immutable sorted slice
//! - **Service layer:** [`PlantDirectory`], the mutable membership view with
//!   a lock-free ring snapshot for readers
//!
//! The ring is sorted by registration time (plant id breaks ties), so every
//! plant that shares the same membership derives the same total order up to
//! rotation.

pub mod domain;
pub mod service;

pub use domain::{ring_cmp, sorted_ring, successor_of};
pub use service::PlantDirectory;
