//! Ring ordering and successor lookup.
//!
//! The logical ring is the membership set sorted by registration time
//! ascending, with plant id as the tie-break. Registration times come from
//! the administration service, so plants sharing a membership view agree on
//! the order.

use shared_types::PlantInfo;
use std::cmp::Ordering;

/// Total order of the ring: registration time ascending, then plant id.
#[must_use]
pub fn ring_cmp(a: &PlantInfo, b: &PlantInfo) -> Ordering {
    a.registration_time
        .cmp(&b.registration_time)
        .then(a.plant_id.cmp(&b.plant_id))
}

/// Build the sorted ring from self plus the other known plants.
///
/// The result always contains `self_info` exactly once; callers pass the
/// others without self.
#[must_use]
pub fn sorted_ring<'a>(
    self_info: &PlantInfo,
    others: impl IntoIterator<Item = &'a PlantInfo>,
) -> Vec<PlantInfo> {
    let mut ring: Vec<PlantInfo> = others.into_iter().cloned().collect();
    ring.push(self_info.clone());
    ring.sort_by(ring_cmp);
    ring
}

/// Successor of `plant_id` in the ring, wrapping at the end.
///
/// Returns `None` when `plant_id` is not a member; the caller decides the
/// fallback (the directory falls back to the ring head with a warning).
#[must_use]
pub fn successor_of(ring: &[PlantInfo], plant_id: u64) -> Option<&PlantInfo> {
    let idx = ring.iter().position(|p| p.plant_id == plant_id)?;
    Some(&ring[(idx + 1) % ring.len()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant(id: u64, reg: i64) -> PlantInfo {
        PlantInfo::new(id, "localhost", 4000 + id as u16, reg)
    }

    #[test]
    fn test_sorted_by_registration_time_then_id() {
        let me = plant(2, 50);
        let others = [plant(3, 10), plant(1, 50), plant(4, 90)];
        let ring = sorted_ring(&me, &others);
        let ids: Vec<u64> = ring.iter().map(|p| p.plant_id).collect();
        assert_eq!(ids, vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_order_is_independent_of_insertion_order() {
        let me = plant(1, 1);
        let a = [plant(2, 2), plant(3, 3), plant(4, 4)];
        let b = [plant(4, 4), plant(2, 2), plant(3, 3)];
        assert_eq!(sorted_ring(&me, &a), sorted_ring(&me, &b));
    }

    #[test]
    fn test_every_member_sees_the_same_cycle() {
        // The ring as derived by plant 1 and by plant 3 is the same total
        // order up to rotation: successors agree everywhere.
        let plants = [plant(1, 1), plant(2, 2), plant(3, 3)];
        let ring_of_1 = sorted_ring(&plants[0], [&plants[1], &plants[2]]);
        let ring_of_3 = sorted_ring(&plants[2], [&plants[0], &plants[1]]);
        for p in &plants {
            assert_eq!(
                successor_of(&ring_of_1, p.plant_id).unwrap().plant_id,
                successor_of(&ring_of_3, p.plant_id).unwrap().plant_id,
            );
        }
    }

    #[test]
    fn test_successor_wraps() {
        let me = plant(1, 1);
        let ring = sorted_ring(&me, [&plant(2, 2), &plant(3, 3)]);
        assert_eq!(successor_of(&ring, 3).unwrap().plant_id, 1);
    }

    #[test]
    fn test_successor_of_unknown_member_is_none() {
        let me = plant(1, 1);
        let ring = sorted_ring(&me, [&plant(2, 2)]);
        assert!(successor_of(&ring, 99).is_none());
    }

    #[test]
    fn test_singleton_ring_succeeds_itself() {
        let me = plant(1, 1);
        let ring = sorted_ring(&me, []);
        assert_eq!(successor_of(&ring, 1).unwrap().plant_id, 1);
    }
}
