//! In-process plant fleets for choreography tests.
//!
//! Each test plant is the real wiring - `PlantDirectory`, `DispatchService`
//! and `ElectionManager` connected through the production adapters - with
//! one substitution: the peer courier routes tokens and announcements
//! directly into the target plant's manager instead of over gRPC. Because
//! the loopback courier awaits the receiving side, a `deliver` call returns
//! only after the whole ring traversal it triggered has settled, which
//! makes the scenario assertions deterministic.

use async_trait::async_trait;
use parking_lot::RwLock;
use plant_runtime::adapters::{DirectoryRing, DispatchPort};
use shared_types::{ElectionToken, EnergyRequest, PlantInfo, WinnerAnnouncement};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use wg_01_plant_registry::PlantDirectory;
use wg_02_dispatch::DispatchService;
use wg_03_election::{CourierError, ElectionManager, PeerCourier, PriceBand};

/// The in-memory "network" connecting a fleet.
#[derive(Default)]
pub struct LoopbackNet {
    managers: RwLock<HashMap<u64, Arc<ElectionManager>>>,
    down: RwLock<HashSet<u64>>,
}

impl LoopbackNet {
    /// Make a plant unreachable; deliveries to it fail like a dead peer.
    pub fn take_down(&self, plant_id: u64) {
        self.down.write().insert(plant_id);
    }

    fn manager(&self, plant_id: u64) -> Result<Arc<ElectionManager>, CourierError> {
        if self.down.read().contains(&plant_id) {
            return Err(CourierError {
                plant_id,
                reason: "connection refused".into(),
            });
        }
        self.managers
            .read()
            .get(&plant_id)
            .cloned()
            .ok_or_else(|| CourierError {
                plant_id,
                reason: "unknown peer".into(),
            })
    }
}

struct LoopbackCourier {
    net: Arc<LoopbackNet>,
}

#[async_trait]
impl PeerCourier for LoopbackCourier {
    async fn forward_token(
        &self,
        to: &PlantInfo,
        token: ElectionToken,
    ) -> Result<(), CourierError> {
        let manager = self.net.manager(to.plant_id)?;
        manager.on_token(token).await;
        Ok(())
    }

    async fn announce_winner(
        &self,
        to: &PlantInfo,
        announcement: WinnerAnnouncement,
    ) -> Result<(), CourierError> {
        let manager = self.net.manager(to.plant_id)?;
        manager.on_winner_announcement(announcement).await;
        Ok(())
    }
}

/// One plant of the fleet, exposing the pieces scenarios assert on.
pub struct TestPlant {
    pub info: PlantInfo,
    pub directory: Arc<PlantDirectory>,
    pub dispatch: Arc<DispatchService>,
    pub manager: Arc<ElectionManager>,
}

impl TestPlant {
    /// Hand a request to this plant's election manager, as the broker
    /// intake pump would.
    pub async fn deliver(&self, request: EnergyRequest) {
        self.manager.on_energy_request(request).await;
    }

    /// Make the plant busy outside any election (a production run already
    /// in progress when the scenario starts). `kwh` is the run length in
    /// milliseconds with the test multiplier of 1.
    pub fn occupy(&self, kwh: u64) {
        let warmup = EnergyRequest::new(format!("WARMUP-{}", self.info.plant_id), kwh, 0);
        assert!(self.dispatch.fulfill(warmup, 0.0));
    }

    /// Id of the request currently in production, if any.
    pub fn current(&self) -> Option<String> {
        self.dispatch.current_request_id()
    }
}

/// A fleet of loopback-connected plants.
///
/// Registration times equal the plant ids, so the ring order is the id
/// order. Each plant bids its fixed configured price.
pub struct Fleet {
    pub net: Arc<LoopbackNet>,
    plants: HashMap<u64, TestPlant>,
    order: Vec<u64>,
}

impl Fleet {
    pub fn new(specs: &[(u64, f64)]) -> Self {
        let net = Arc::new(LoopbackNet::default());
        let infos: Vec<PlantInfo> = specs
            .iter()
            .map(|&(id, _)| PlantInfo::new(id, "localhost", 4000 + id as u16, id as i64))
            .collect();

        let mut plants = HashMap::new();
        for (&(id, price), info) in specs.iter().zip(&infos) {
            let directory = Arc::new(PlantDirectory::new(info.clone()));
            directory.add_initial(infos.clone());

            let (dispatch, mut next_up) = DispatchService::new(id, 1);
            let manager = ElectionManager::new(
                Arc::new(DirectoryRing(Arc::clone(&directory))),
                Arc::new(DispatchPort(Arc::clone(&dispatch))),
                Arc::new(LoopbackCourier {
                    net: Arc::clone(&net),
                }),
                PriceBand::new(price, price),
                Duration::from_secs(5),
            );
            net.managers.write().insert(id, Arc::clone(&manager));

            // The runtime's "next up" pump: dequeued requests re-enter the
            // election manager after each production run.
            let pump_manager = Arc::clone(&manager);
            tokio::spawn(async move {
                while let Some(request) = next_up.recv().await {
                    pump_manager.on_energy_request(request).await;
                }
            });

            plants.insert(
                id,
                TestPlant {
                    info: info.clone(),
                    directory,
                    dispatch,
                    manager,
                },
            );
        }

        Self {
            net,
            plants,
            order: specs.iter().map(|&(id, _)| id).collect(),
        }
    }

    pub fn plant(&self, plant_id: u64) -> &TestPlant {
        &self.plants[&plant_id]
    }

    /// Deliver the same request to every plant, in fleet order, the way an
    /// MQTT broadcast fans out.
    pub async fn broadcast(&self, request: EnergyRequest) {
        for id in &self.order {
            self.plant(*id).deliver(request.clone()).await;
        }
    }
}

/// Poll `condition` until it holds, panicking after three seconds.
pub async fn wait_for(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
