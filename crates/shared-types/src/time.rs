//! Wall-clock helpers.
//!
//! Every timestamp in the system is epoch milliseconds. Registration times,
//! request timestamps, measurement timestamps and batch computation times all
//! use the same scale so range queries compare directly.

/// Current wall-clock time as epoch milliseconds.
#[must_use]
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_millis_is_monotonic_enough() {
        let a = epoch_millis();
        let b = epoch_millis();
        assert!(b >= a);
        // Sanity: we are well past 2020-01-01 in milliseconds.
        assert!(a > 1_577_836_800_000);
    }
}
