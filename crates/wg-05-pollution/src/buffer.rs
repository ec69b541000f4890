//! Thread-safe drainable buffer between the sensor and the aggregator.

use parking_lot::Mutex;
use shared_types::Measurement;

/// Unbounded append-and-drain queue. The sensor appends; the aggregator
/// periodically takes everything accumulated since its last pass.
#[derive(Default)]
pub struct MeasurementBuffer {
    inner: Mutex<Vec<Measurement>>,
}

impl MeasurementBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, measurement: Measurement) {
        self.inner.lock().push(measurement);
    }

    /// Take all buffered measurements, leaving the buffer empty.
    #[must_use]
    pub fn drain(&self) -> Vec<Measurement> {
        std::mem::take(&mut *self.inner.lock())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_takes_everything_in_order() {
        let buffer = MeasurementBuffer::new();
        buffer.push(Measurement::new(1.0, 1));
        buffer.push(Measurement::new(2.0, 2));

        let drained = buffer.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].value, 1.0);
        assert_eq!(drained[1].value, 2.0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_on_empty_is_empty() {
        let buffer = MeasurementBuffer::new();
        assert!(buffer.drain().is_empty());
    }
}
