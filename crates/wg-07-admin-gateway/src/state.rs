//! In-memory administration state.
//!
//! Nothing here is persisted; a restarted gateway starts from an empty
//! plant map and an empty batch log, and plants re-register as fresh
//! members.

use parking_lot::RwLock;
use shared_types::{PlantInfo, PollutionBatch};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

/// Registration refused: the id is already taken.
#[derive(Debug, Clone, Error)]
#[error("plant id {0} already registered")]
pub struct RegistrationConflict(pub u64);

/// Shared state behind the gateway handlers and the broker ingest task.
#[derive(Default)]
pub struct AdminState {
    plants: RwLock<HashMap<u64, PlantInfo>>,
    batches: RwLock<Vec<PollutionBatch>>,
}

impl AdminState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plant, returning the plants that were already registered
    /// (the newcomer excluded) so the caller can seed its membership view.
    pub fn register(&self, plant: PlantInfo) -> Result<Vec<PlantInfo>, RegistrationConflict> {
        let mut plants = self.plants.write();
        if plants.contains_key(&plant.plant_id) {
            return Err(RegistrationConflict(plant.plant_id));
        }
        let mut others: Vec<PlantInfo> = plants.values().cloned().collect();
        others.sort_by_key(|p| p.plant_id);
        info!(
            plant_id = plant.plant_id,
            address = %plant.address,
            port = plant.port,
            "Plant registered"
        );
        plants.insert(plant.plant_id, plant);
        Ok(others)
    }

    /// Every registered plant, sorted by id for stable output.
    #[must_use]
    pub fn plants(&self) -> Vec<PlantInfo> {
        let mut all: Vec<PlantInfo> = self.plants.read().values().cloned().collect();
        all.sort_by_key(|p| p.plant_id);
        all
    }

    #[must_use]
    pub fn plant(&self, plant_id: u64) -> Option<PlantInfo> {
        self.plants.read().get(&plant_id).cloned()
    }

    /// Record a pollution batch received over the broker.
    pub fn record_batch(&self, batch: PollutionBatch) {
        debug!(
            plant_id = batch.plant_id,
            averages = batch.averages.len(),
            "Pollution batch recorded"
        );
        self.batches.write().push(batch);
    }

    /// Mean over every plant-level average whose batch was computed within
    /// `[t1, t2]`, or `None` when no batch matches.
    #[must_use]
    pub fn co2_average(&self, t1: i64, t2: i64) -> Option<f64> {
        let batches = self.batches.read();
        let mut sum = 0.0;
        let mut count = 0usize;
        for batch in batches
            .iter()
            .filter(|b| (t1..=t2).contains(&b.list_computation_timestamp))
        {
            sum += batch.averages.iter().sum::<f64>();
            count += batch.averages.len();
        }
        (count > 0).then(|| sum / count as f64)
    }
}
