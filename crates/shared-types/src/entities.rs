//! # Core Domain Entities
//!
//! Defines the entities of the distributed energy market.
//!
//! ## Clusters
//!
//! - **Membership**: `PlantInfo`
//! - **Market**: `EnergyRequest`, `Bid`
//! - **Election**: `ElectionToken`, `WinnerAnnouncement`
//! - **Pollution**: `Measurement`, `PollutionBatch`

use serde::{Deserialize, Serialize};

// =============================================================================
// CLUSTER A: MEMBERSHIP
// =============================================================================

/// Identity and peer endpoint of a power plant.
///
/// `registration_time` is assigned once at registration and echoed back by
/// the administration service; it is the primary sort key for the logical
/// ring, so every plant derives the same ring order from the same membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantInfo {
    /// Unique plant identifier. Zero is reserved (see [`Bid::NONE`]).
    pub plant_id: u64,
    /// Host the peer RPC server listens on.
    pub address: String,
    /// Peer RPC port.
    pub port: u16,
    /// Registration instant, epoch milliseconds.
    pub registration_time: i64,
}

impl PlantInfo {
    pub fn new(plant_id: u64, address: impl Into<String>, port: u16, registration_time: i64) -> Self {
        Self {
            plant_id,
            address: address.into(),
            port,
            registration_time,
        }
    }

    /// URI of the plant's peer RPC server.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }

    /// A registration body is acceptable when the id is positive, the host
    /// is non-empty and the port is in range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.plant_id > 0 && !self.address.trim().is_empty() && self.port > 0
    }
}

// =============================================================================
// CLUSTER B: MARKET
// =============================================================================

/// An energy request broadcast by the renewable-energy provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyRequest {
    /// Globally unique request identifier.
    pub request_id: String,
    /// Requested energy, kilowatt-hours.
    pub amount_kwh: u64,
    /// Emission instant, epoch milliseconds.
    pub timestamp: i64,
}

impl EnergyRequest {
    pub fn new(request_id: impl Into<String>, amount_kwh: u64, timestamp: i64) -> Self {
        Self {
            request_id: request_id.into(),
            amount_kwh,
            timestamp,
        }
    }

    /// Intake drops requests with a blank id or a zero amount.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.request_id.trim().is_empty() && self.amount_kwh > 0
    }
}

/// A plant's offer to fulfill a request.
///
/// `plant_id == 0` is the "no bid" sentinel that seeds an election before
/// any plant has offered a price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub plant_id: u64,
    pub price: f64,
}

impl Bid {
    /// The "no bid yet" sentinel. Loses against every valid bid.
    pub const NONE: Bid = Bid {
        plant_id: 0,
        price: 0.0,
    };

    pub fn new(plant_id: u64, price: f64) -> Self {
        Self { plant_id, price }
    }

    /// True when this is the sentinel.
    #[must_use]
    pub fn is_none(&self) -> bool {
        self.plant_id == 0
    }

    /// Strict better-bid relation used by every plant.
    ///
    /// Lower price wins; on equal price the higher plant id wins. The
    /// sentinel loses to any valid bid. For two valid bids from distinct
    /// plants exactly one of `a.beats(b)` / `b.beats(a)` holds, which is
    /// what guarantees a unique election winner regardless of the order
    /// the token traverses the ring.
    #[must_use]
    pub fn beats(&self, other: &Bid) -> bool {
        if self.is_none() {
            return false;
        }
        if other.is_none() {
            return true;
        }
        self.price < other.price || (self.price == other.price && self.plant_id > other.plant_id)
    }
}

// =============================================================================
// CLUSTER C: ELECTION WIRE VALUES
// =============================================================================

/// The token circulated around the ring during an election.
///
/// Carries the best bid seen so far and enough of the request
/// (`energy_amount_kwh`) for a plant that never saw the request via intake
/// to reconstruct local election state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionToken {
    /// Plant that started this token's circulation.
    pub initiator_id: u64,
    /// Request the election is for.
    pub request_id: String,
    /// Best bid observed along the traversal so far.
    pub best_bid: Bid,
    /// Requested energy, duplicated from the originating request.
    pub energy_amount_kwh: u64,
}

/// Circulated around the ring once the initiator has determined the winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerAnnouncement {
    pub request_id: String,
    pub winning_plant_id: u64,
    pub winning_price: f64,
    /// Initiator of the election that produced this announcement; the
    /// announcement stops circulating when it returns to this plant.
    pub initiator_id: u64,
}

// =============================================================================
// CLUSTER D: POLLUTION TELEMETRY
// =============================================================================

/// One timestamped CO₂ reading from the plant's sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub value: f64,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl Measurement {
    pub fn new(value: f64, timestamp: i64) -> Self {
        Self { value, timestamp }
    }
}

/// A batch of sliding-window averages published by one plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollutionBatch {
    pub plant_id: u64,
    /// Instant the batch was assembled, epoch milliseconds. Range queries on
    /// the administration service filter on this field.
    pub list_computation_timestamp: i64,
    /// Window averages in computation order. Never empty on the wire.
    pub averages: Vec<f64>,
}

impl PollutionBatch {
    pub fn new(plant_id: u64, list_computation_timestamp: i64, averages: Vec<f64>) -> Self {
        Self {
            plant_id,
            list_computation_timestamp,
            averages,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.plant_id > 0 && !self.averages.is_empty()
    }
}
