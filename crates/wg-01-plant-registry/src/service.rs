//! The membership service owning the plant set and the derived ring.

use crate::domain::{sorted_ring, successor_of};
use parking_lot::{Mutex, RwLock};
use shared_types::PlantInfo;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Membership view of one plant process.
///
/// Mutations (peer announcements, startup seeding, evictions) take the
/// member lock and invalidate the cached ring. Readers grab the cached
/// sorted ring without touching the member lock; the first reader after a
/// mutation rebuilds it.
///
/// Two plants with the same id never coexist here: `add` refuses ids that
/// are already present, and the self id is never inserted into the member
/// map at all (the ring derivation appends self).
pub struct PlantDirectory {
    self_info: PlantInfo,
    members: Mutex<HashMap<u64, PlantInfo>>,
    ring_cache: RwLock<Option<Arc<[PlantInfo]>>>,
}

impl PlantDirectory {
    pub fn new(self_info: PlantInfo) -> Self {
        Self {
            self_info,
            members: Mutex::new(HashMap::new()),
            ring_cache: RwLock::new(None),
        }
    }

    /// This plant's own identity.
    #[must_use]
    pub fn self_info(&self) -> &PlantInfo {
        &self.self_info
    }

    #[must_use]
    pub fn self_id(&self) -> u64 {
        self.self_info.plant_id
    }

    /// Seed the directory from the list returned at registration.
    ///
    /// Idempotent: self and already-known ids are skipped. Returns how many
    /// plants were actually added.
    pub fn add_initial(&self, plants: Vec<PlantInfo>) -> usize {
        let mut added = 0;
        {
            let mut members = self.members.lock();
            for plant in plants {
                if plant.plant_id == self.self_info.plant_id
                    || members.contains_key(&plant.plant_id)
                {
                    continue;
                }
                members.insert(plant.plant_id, plant);
                added += 1;
            }
        }
        if added > 0 {
            self.invalidate_ring();
        }
        debug!(added, "Seeded plant directory");
        added
    }

    /// Insert a newly announced plant. Returns false for self or a known id.
    pub fn add(&self, plant: PlantInfo) -> bool {
        if plant.plant_id == self.self_info.plant_id {
            return false;
        }
        let inserted = {
            let mut members = self.members.lock();
            if members.contains_key(&plant.plant_id) {
                false
            } else {
                debug!(plant_id = plant.plant_id, "Plant joined");
                members.insert(plant.plant_id, plant);
                true
            }
        };
        if inserted {
            self.invalidate_ring();
        }
        inserted
    }

    /// Drop a plant presumed gone. No-op when the id is unknown.
    pub fn remove(&self, plant_id: u64) -> bool {
        if plant_id == self.self_info.plant_id {
            warn!(plant_id, "Refusing to evict self from the directory");
            return false;
        }
        let removed = self.members.lock().remove(&plant_id).is_some();
        if removed {
            debug!(plant_id, "Plant evicted");
            self.invalidate_ring();
        }
        removed
    }

    /// Point-in-time copy of the other known plants, in no particular order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PlantInfo> {
        self.members.lock().values().cloned().collect()
    }

    /// Number of other known plants.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.members.lock().len()
    }

    /// The sorted logical ring: others plus self.
    ///
    /// Cheap for readers: returns the cached immutable snapshot when one is
    /// present, rebuilding it under the member lock otherwise.
    #[must_use]
    pub fn ring(&self) -> Arc<[PlantInfo]> {
        if let Some(ring) = self.ring_cache.read().as_ref() {
            return Arc::clone(ring);
        }
        let members = self.members.lock();
        let ring: Arc<[PlantInfo]> = sorted_ring(&self.self_info, members.values()).into();
        *self.ring_cache.write() = Some(Arc::clone(&ring));
        ring
    }

    /// Successor of `current_plant_id` in the ring, wrapping at the end.
    ///
    /// When the id is not a member (it was evicted between deriving the ring
    /// and asking for a successor) the ring head is returned so circulation
    /// can continue somewhere deterministic.
    #[must_use]
    pub fn next_in_ring(&self, current_plant_id: u64) -> PlantInfo {
        let ring = self.ring();
        match successor_of(&ring, current_plant_id) {
            Some(next) => next.clone(),
            None => {
                warn!(
                    plant_id = current_plant_id,
                    "Successor lookup for unknown plant, falling back to ring head"
                );
                ring[0].clone()
            }
        }
    }

    fn invalidate_ring(&self) {
        *self.ring_cache.write() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant(id: u64, reg: i64) -> PlantInfo {
        PlantInfo::new(id, "localhost", 4000 + id as u16, reg)
    }

    fn directory() -> PlantDirectory {
        PlantDirectory::new(plant(1, 10))
    }

    #[test]
    fn test_add_rejects_self_and_duplicates() {
        let dir = directory();
        assert!(!dir.add(plant(1, 10)));
        assert!(dir.add(plant(2, 20)));
        assert!(!dir.add(plant(2, 99)));
        assert_eq!(dir.peer_count(), 1);
    }

    #[test]
    fn test_add_initial_is_idempotent() {
        let dir = directory();
        let seed = vec![plant(1, 10), plant(2, 20), plant(3, 30)];
        assert_eq!(dir.add_initial(seed.clone()), 2);
        assert_eq!(dir.add_initial(seed), 0);
        assert_eq!(dir.peer_count(), 2);
    }

    #[test]
    fn test_ring_contains_self_exactly_once() {
        let dir = directory();
        dir.add(plant(2, 20));
        let ring = dir.ring();
        assert_eq!(ring.iter().filter(|p| p.plant_id == 1).count(), 1);
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_ring_cache_is_invalidated_by_mutation() {
        let dir = directory();
        dir.add(plant(2, 20));
        assert_eq!(dir.ring().len(), 2);
        dir.add(plant(3, 5));
        let ring = dir.ring();
        assert_eq!(ring.len(), 3);
        // Plant 3 registered earliest, so it now heads the ring.
        assert_eq!(ring[0].plant_id, 3);
    }

    #[test]
    fn test_repeated_reads_share_the_snapshot() {
        let dir = directory();
        dir.add(plant(2, 20));
        let a = dir.ring();
        let b = dir.ring();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_next_in_ring_wraps() {
        let dir = directory();
        dir.add(plant(2, 20));
        dir.add(plant(3, 30));
        assert_eq!(dir.next_in_ring(1).plant_id, 2);
        assert_eq!(dir.next_in_ring(3).plant_id, 1);
    }

    #[test]
    fn test_next_in_ring_unknown_id_falls_back_to_head() {
        let dir = directory();
        dir.add(plant(2, 20));
        assert_eq!(dir.next_in_ring(42).plant_id, 1);
    }

    #[test]
    fn test_next_in_ring_alone_returns_self() {
        let dir = directory();
        assert_eq!(dir.next_in_ring(1).plant_id, 1);
    }

    #[test]
    fn test_remove_is_noop_for_unknown_and_self() {
        let dir = directory();
        dir.add(plant(2, 20));
        assert!(!dir.remove(99));
        assert!(!dir.remove(1));
        assert!(dir.remove(2));
        assert_eq!(dir.peer_count(), 0);
    }
}
