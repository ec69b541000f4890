//! # Market Broker Adapters
//!
//! MQTT plumbing between the plants, the renewable-energy provider and the
//! administration service:
//!
//! - inbound energy requests (subscribe, validate, hand off over a channel)
//! - outbound pollution batches (QoS 2, exactly-once)
//! - outbound energy requests, used by the provider process
//!
//! One [`BrokerClient`] per process drives a single MQTT connection; its
//! event-loop task keeps polling through connection errors, which is what
//! gives us automatic reconnection.

pub mod client;
pub mod codec;
pub mod intake;
pub mod publish;

pub use client::{parse_broker_url, BrokerClient, BrokerConfig, BrokerError};
pub use intake::spawn_request_intake;
pub use publish::{BrokerBatchSink, RequestPublisher};
