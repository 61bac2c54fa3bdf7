//! Beat-to-beat interval buffer
//!
//! Keeps a bounded FIFO window of RR intervals and derives SDNN from it.
//! The window is session scoped: the orchestrator clears it whenever the
//! device (re)enters the connected state.

use crate::config::{DEFAULT_HRV_MIN_SAMPLES, DEFAULT_INTERVAL_CAPACITY};
use std::collections::VecDeque;

/// Duration in milliseconds between two consecutive heartbeats
pub type IntervalSample = i32;

/// Bounded FIFO of recent RR intervals
#[derive(Debug, Clone)]
pub struct IntervalBuffer {
    samples: VecDeque<IntervalSample>,
    capacity: usize,
    min_samples: usize,
}

impl Default for IntervalBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL_CAPACITY, DEFAULT_HRV_MIN_SAMPLES)
    }
}

impl IntervalBuffer {
    /// Create a buffer holding at most `capacity` samples that reports ready
    /// once it holds `min_samples`
    pub fn new(capacity: usize, min_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
            min_samples,
        }
    }

    /// Append a batch, evicting the oldest samples beyond capacity
    pub fn append(&mut self, batch: &[IntervalSample]) {
        self.samples.extend(batch.iter().copied());
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Whether enough samples are buffered to report HRV
    pub fn is_ready(&self) -> bool {
        self.samples.len() >= self.min_samples
    }

    /// SDNN over the buffered intervals, truncated to whole milliseconds.
    ///
    /// Uses the population variance (divides by N). Returns 0 when empty.
    pub fn compute_hrv(&self) -> i32 {
        if self.samples.is_empty() {
            return 0;
        }
        let n = self.samples.len() as f64;
        let mean = self.samples.iter().map(|&s| s as f64).sum::<f64>() / n;
        let sum_sq_diff: f64 = self
            .samples
            .iter()
            .map(|&s| (s as f64 - mean).powi(2))
            .sum();
        (sum_sq_diff / n).sqrt() as i32
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffered samples, oldest first
    pub fn samples(&self) -> impl Iterator<Item = IntervalSample> + '_ {
        self.samples.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sdnn_reference_window() {
        let mut buffer = IntervalBuffer::default();
        buffer.append(&[800, 810, 790, 805, 795]);

        assert!(buffer.is_ready());
        // squared deviations sum to 250, /5 = 50, sqrt(50) = 7.07
        assert_eq!(buffer.compute_hrv(), 7);
    }

    #[test]
    fn test_sdnn_truncates_fraction() {
        let mut buffer = IntervalBuffer::default();
        buffer.append(&[600, 700, 800, 900, 1000]);

        // variance 20000, sqrt = 141.42
        assert_eq!(buffer.compute_hrv(), 141);

        // population variance; dividing by N - 1 would give 141
        buffer.clear();
        buffer.append(&[700, 900]);
        assert_eq!(buffer.compute_hrv(), 100);
    }

    #[test]
    fn test_not_ready_below_threshold() {
        let mut buffer = IntervalBuffer::default();
        buffer.append(&[800, 810, 790, 805]);
        assert!(!buffer.is_ready());

        buffer.append(&[795]);
        assert!(buffer.is_ready());
    }

    #[test]
    fn test_empty_buffer_reports_zero() {
        let buffer = IntervalBuffer::default();
        assert_eq!(buffer.compute_hrv(), 0);
    }

    #[test]
    fn test_constant_intervals_have_no_variability() {
        let mut buffer = IntervalBuffer::default();
        buffer.append(&[1000; 12]);
        assert_eq!(buffer.compute_hrv(), 0);
    }

    #[test]
    fn test_eviction_keeps_last_capacity_in_order() {
        let mut buffer = IntervalBuffer::default();
        let appended: Vec<i32> = (0..137).map(|i| 600 + i).collect();

        for chunk in appended.chunks(9) {
            buffer.append(chunk);
            assert!(buffer.len() <= 50);
        }

        let retained: Vec<i32> = buffer.samples().collect();
        assert_eq!(retained, appended[appended.len() - 50..].to_vec());
    }

    #[test]
    fn test_single_oversized_batch_is_trimmed() {
        let mut buffer = IntervalBuffer::new(4, 2);
        buffer.append(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(buffer.samples().collect::<Vec<_>>(), vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_clear_resets_readiness() {
        let mut buffer = IntervalBuffer::default();
        buffer.append(&[800, 810, 790, 805, 795]);
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(!buffer.is_ready());
    }
}
