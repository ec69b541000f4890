//! Ports the election manager drives.
//!
//! The manager only sees these traits; the runtime wires them to the plant
//! directory, the dispatch service and the peer RPC client, and the test
//! suites wire them to in-memory fakes.

use async_trait::async_trait;
use shared_types::{ElectionToken, EnergyRequest, PlantInfo, WinnerAnnouncement};
use thiserror::Error;

/// Outbound peer delivery failed; the peer may be gone.
#[derive(Debug, Clone, Error)]
#[error("peer {plant_id} unreachable: {reason}")]
pub struct CourierError {
    pub plant_id: u64,
    pub reason: String,
}

/// Read view of the membership ring, plus the eviction hook the
/// winner-circulation failure policy needs.
pub trait RingView: Send + Sync {
    fn self_info(&self) -> PlantInfo;
    /// Successor of `plant_id`, wrapping; self when the ring is a singleton.
    fn next_in_ring(&self, plant_id: u64) -> PlantInfo;
    /// Drop an unreachable peer from the membership view.
    fn evict(&self, plant_id: u64) -> bool;
}

/// The request processor as the election manager sees it.
pub trait Dispatcher: Send + Sync {
    fn is_busy(&self) -> bool;
    fn enqueue(&self, request: EnergyRequest) -> bool;
    fn remove_by_id(&self, request_id: &str) -> bool;
    fn fulfill(&self, request: EnergyRequest, price: f64) -> bool;
}

/// Outbound peer RPC surface used during an election. Implementations carry
/// their own deadlines; a returned error means the delivery did not happen.
#[async_trait]
pub trait PeerCourier: Send + Sync {
    async fn forward_token(
        &self,
        to: &PlantInfo,
        token: ElectionToken,
    ) -> Result<(), CourierError>;

    async fn announce_winner(
        &self,
        to: &PlantInfo,
        announcement: WinnerAnnouncement,
    ) -> Result<(), CourierError>;
}
