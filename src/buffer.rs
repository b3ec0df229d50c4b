//! Fixed-capacity rolling history shared by the trigger detector, the
//! movement classifiers and the performance monitor.

use crate::{Error, Result};
use std::collections::VecDeque;

/// FIFO of the most recent `capacity` samples.
///
/// Pushing into a full buffer evicts the oldest sample. Insertion order is
/// preserved, so `snapshot()[0]` is always the oldest retained sample.
#[derive(Debug, Clone)]
pub struct RollingBuffer<T> {
    capacity: usize,
    samples: VecDeque<T>,
}

impl<T> RollingBuffer<T> {
    /// Create an empty buffer
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::ConfigError(
                "Rolling buffer capacity must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        })
    }

    /// Append a sample, evicting the oldest one when full
    pub fn push(&mut self, sample: T) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<&T> {
        self.samples.back()
    }

    /// Iterate from oldest to newest without copying
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.samples.iter()
    }
}

impl<T: Clone> RollingBuffer<T> {
    /// Ordered copy of the current contents, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        self.samples.iter().cloned().collect()
    }

    /// The last `n` samples in insertion order, or `None` if fewer are held
    pub fn last_n(&self, n: usize) -> Option<Vec<T>> {
        if n > self.samples.len() {
            return None;
        }
        Some(self.samples.iter().skip(self.samples.len() - n).cloned().collect())
    }
}

impl RollingBuffer<f64> {
    /// Arithmetic mean of the held samples
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn min(&self) -> Option<f64> {
        self.samples.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.samples.iter().copied().reduce(f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(RollingBuffer::<f64>::new(0), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_eviction_order() {
        let mut buffer = RollingBuffer::new(3).unwrap();
        for i in 0..5 {
            buffer.push(i);
        }
        assert_eq!(buffer.snapshot(), vec![2, 3, 4]);
        assert_eq!(buffer.latest(), Some(&4));
        assert!(buffer.is_full());
    }

    #[test]
    fn test_last_n() {
        let mut buffer = RollingBuffer::new(5).unwrap();
        buffer.push(1.0);
        buffer.push(2.0);
        assert_eq!(buffer.last_n(3), None);
        buffer.push(3.0);
        assert_eq!(buffer.last_n(2), Some(vec![2.0, 3.0]));
    }

    #[test]
    fn test_statistics() {
        let mut buffer = RollingBuffer::new(4).unwrap();
        assert_eq!(buffer.mean(), None);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            buffer.push(v);
        }
        assert_eq!(buffer.mean(), Some(3.5));
        assert_eq!(buffer.min(), Some(2.0));
        assert_eq!(buffer.max(), Some(5.0));
    }

    #[test]
    fn test_clear() {
        let mut buffer = RollingBuffer::new(2).unwrap();
        buffer.push('a');
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 2);
    }

    proptest! {
        #[test]
        fn prop_len_is_min_of_pushes_and_capacity(capacity in 1usize..64, pushes in 0usize..200) {
            let mut buffer = RollingBuffer::new(capacity).unwrap();
            for i in 0..pushes {
                buffer.push(i);
            }
            prop_assert_eq!(buffer.len(), pushes.min(capacity));
        }

        #[test]
        fn prop_snapshot_keeps_last_pushes_in_order(capacity in 1usize..32, values in prop::collection::vec(any::<i32>(), 0..100)) {
            let mut buffer = RollingBuffer::new(capacity).unwrap();
            for &v in &values {
                buffer.push(v);
            }
            let start = values.len().saturating_sub(capacity);
            prop_assert_eq!(buffer.snapshot(), values[start..].to_vec());
        }
    }
}
