//! Pure ring logic, no locking and no I/O.

mod ring;

pub use ring::{ring_cmp, sorted_ring, successor_of};
