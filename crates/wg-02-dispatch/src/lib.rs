//! # Request Processor Subsystem
//!
//! Owns the plant's busy/idle state and the pending-request queue.
//!
//! A plant produces for exactly one request at a time. Requests that arrive
//! while production is running are queued (one entry per request id); when
//! production completes the head of the queue is handed back to the election
//! layer over a channel, so this crate never calls into the election crate
//! directly and ownership stays acyclic.

pub mod service;

pub use service::{DispatchService, NextUpReceiver};
