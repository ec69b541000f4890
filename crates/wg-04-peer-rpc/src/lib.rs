//! # Peer RPC Subsystem
//!
//! The gRPC surface plants use to talk to each other: presence
//! announcements, election-token circulation and winner announcements.
//!
//! The server acknowledges every call immediately and hands the payload to
//! the runtime over a channel, so an RPC worker is never blocked by
//! downstream forwarding. The client keeps one long-lived channel per peer,
//! created lazily, with a fixed deadline on every call. Handler-side
//! failures answer `Ack { success: false }` rather than a transport error.

pub mod client;
pub mod proto;
pub mod server;

pub use client::{PeerClient, PeerRpcError};
pub use server::{spawn_server, PeerEvent, PeerServer, PeerServerHandle};
