//! Bid pricing.

use rand::Rng;

/// Inclusive price bounds a plant draws its bids from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBand {
    pub min: f64,
    pub max: f64,
}

impl PriceBand {
    /// Bounds are normalized so `min <= max` even if configured backwards.
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Draw a bid price: uniform in `[min, max]`, rounded to 2 decimals.
    #[must_use]
    pub fn sample(&self) -> f64 {
        let raw = rand::thread_rng().gen_range(self.min..=self.max);
        (raw * 100.0).round() / 100.0
    }
}

impl Default for PriceBand {
    fn default() -> Self {
        Self { min: 0.1, max: 0.9 }
    }
}
