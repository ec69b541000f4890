//! Wiring adapters: the election manager's ports over the real subsystems.

use async_trait::async_trait;
use shared_types::{ElectionToken, EnergyRequest, PlantInfo, WinnerAnnouncement};
use std::sync::Arc;
use wg_01_plant_registry::PlantDirectory;
use wg_02_dispatch::DispatchService;
use wg_03_election::{CourierError, Dispatcher, PeerCourier, RingView};
use wg_04_peer_rpc::PeerClient;

/// [`RingView`] over the plant directory.
pub struct DirectoryRing(pub Arc<PlantDirectory>);

impl RingView for DirectoryRing {
    fn self_info(&self) -> PlantInfo {
        self.0.self_info().clone()
    }

    fn next_in_ring(&self, plant_id: u64) -> PlantInfo {
        self.0.next_in_ring(plant_id)
    }

    fn evict(&self, plant_id: u64) -> bool {
        self.0.remove(plant_id)
    }
}

/// [`Dispatcher`] over the dispatch service.
pub struct DispatchPort(pub Arc<DispatchService>);

impl Dispatcher for DispatchPort {
    fn is_busy(&self) -> bool {
        self.0.is_busy()
    }

    fn enqueue(&self, request: EnergyRequest) -> bool {
        self.0.enqueue(request)
    }

    fn remove_by_id(&self, request_id: &str) -> bool {
        self.0.remove_by_id(request_id)
    }

    fn fulfill(&self, request: EnergyRequest, price: f64) -> bool {
        self.0.fulfill(request, price)
    }
}

/// [`PeerCourier`] over the gRPC peer client.
pub struct GrpcCourier(pub Arc<PeerClient>);

#[async_trait]
impl PeerCourier for GrpcCourier {
    async fn forward_token(
        &self,
        to: &PlantInfo,
        token: ElectionToken,
    ) -> Result<(), CourierError> {
        self.0
            .forward_token(to, token)
            .await
            .map_err(|e| CourierError {
                plant_id: to.plant_id,
                reason: e.to_string(),
            })
    }

    async fn announce_winner(
        &self,
        to: &PlantInfo,
        announcement: WinnerAnnouncement,
    ) -> Result<(), CourierError> {
        self.0
            .announce_winner(to, announcement)
            .await
            .map_err(|e| CourierError {
                plant_id: to.plant_id,
                reason: e.to_string(),
            })
    }
}
