//! # Watt-Grid Test Suite
//!
//! Cross-subsystem scenario tests over in-process plant fleets.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # Loopback fleet: real registry/dispatch/election
//! │                     # wiring, courier routed in memory
//! └── integration/      # Market choreography and telemetry scenarios
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p wg-tests
//! cargo test -p wg-tests integration::market
//! ```

pub mod harness;

#[cfg(test)]
mod integration;
