//! Overlapping sliding-window averaging.

use parking_lot::Mutex;
use shared_types::Measurement;
use std::collections::VecDeque;

/// FIFO window of size `window_size` producing one arithmetic mean per full
/// window, then discarding the oldest `discard` readings.
///
/// With the default 8/4 split consecutive windows overlap by half, so a
/// reading contributes to at most two averages. A window that never fills
/// emits nothing: there are no partial averages.
pub struct SlidingWindow {
    window_size: usize,
    discard: usize,
    pending: VecDeque<Measurement>,
}

impl SlidingWindow {
    pub const DEFAULT_WINDOW_SIZE: usize = 8;
    pub const DEFAULT_DISCARD: usize = 4;

    /// `discard` must be in `1..=window_size`; out-of-range values are
    /// clamped rather than panicking mid-pipeline.
    pub fn new(window_size: usize, discard: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            discard: discard.clamp(1, window_size),
            pending: VecDeque::new(),
        }
    }

    /// Feed one reading; returns any averages completed by it.
    pub fn push(&mut self, measurement: Measurement) -> Vec<f64> {
        self.pending.push_back(measurement);
        self.drain_full_windows()
    }

    /// Feed a drained batch; returns the averages in computation order.
    pub fn extend(&mut self, measurements: impl IntoIterator<Item = Measurement>) -> Vec<f64> {
        self.pending.extend(measurements);
        self.drain_full_windows()
    }

    /// Readings waiting for the next full window.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    fn drain_full_windows(&mut self) -> Vec<f64> {
        let mut averages = Vec::new();
        while self.pending.len() >= self.window_size {
            let sum: f64 = self
                .pending
                .iter()
                .take(self.window_size)
                .map(|m| m.value)
                .sum();
            averages.push(sum / self.window_size as f64);
            self.pending.drain(..self.discard);
        }
        averages
    }
}

impl Default for SlidingWindow {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW_SIZE, Self::DEFAULT_DISCARD)
    }
}

/// Averages computed since the last publish, in computation order.
#[derive(Default)]
pub struct AverageStore {
    averages: Mutex<Vec<f64>>,
}

impl AverageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, mut new_averages: Vec<f64>) {
        if new_averages.is_empty() {
            return;
        }
        self.averages.lock().append(&mut new_averages);
    }

    /// Atomically take everything accumulated, leaving the store empty.
    #[must_use]
    pub fn get_and_clear(&self) -> Vec<f64> {
        std::mem::take(&mut *self.averages.lock())
    }
}
