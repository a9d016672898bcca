//! Bounded moving average with cold-start passthrough.

use crate::config::AveragingCfg;

/// Ring-buffer history for one signal.
///
/// Holds at most `max_history` values; once full the oldest value is
/// overwritten. `add` returns the mean of everything retained once at least
/// `window` values are present, and the input itself before that. The mean
/// is over the whole buffer, not a `window`-sized slice, so it keeps
/// widening until the buffer saturates.
#[derive(Debug, Clone)]
pub struct RollingAverage {
    ring: Box<[f64]>,
    head: usize,
    len: usize,
    window: usize,
}

impl RollingAverage {
    /// `max_history` is raised to at least `max(window, 1)`.
    pub fn new(window: usize, max_history: usize) -> Self {
        let cap = max_history.max(window).max(1);
        Self {
            ring: vec![0.0; cap].into_boxed_slice(),
            head: 0,
            len: 0,
            window,
        }
    }

    pub fn from_cfg(cfg: &AveragingCfg) -> Self {
        Self::new(cfg.window, cfg.max_history)
    }

    pub fn add(&mut self, value: f64) -> f64 {
        self.ring[self.head] = value;
        self.head = (self.head + 1) % self.ring.len();
        if self.len < self.ring.len() {
            self.len += 1;
        }

        if self.len >= self.window {
            self.mean()
        } else {
            value
        }
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.ring.len()
    }

    /// Mean of all retained samples; `None` when empty.
    pub fn current(&self) -> Option<f64> {
        (self.len > 0).then(|| self.mean())
    }

    fn mean(&self) -> f64 {
        // Until the ring wraps, the live entries are ring[..len]; afterwards all of it.
        let sum: f64 = self.ring[..self.len].iter().sum();
        sum / self.len as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_returns_input() {
        let mut avg = RollingAverage::new(20, 500);
        assert_eq!(avg.add(5.0), 5.0);
    }

    #[test]
    fn passthrough_until_window_is_reached() {
        let mut avg = RollingAverage::new(3, 10);
        assert_eq!(avg.add(1.0), 1.0);
        assert_eq!(avg.add(10.0), 10.0);
        assert_eq!(avg.add(4.0), 5.0);
    }

    #[test]
    fn mean_covers_whole_history_past_window() {
        let mut avg = RollingAverage::new(2, 10);
        avg.add(1.0);
        avg.add(2.0);
        avg.add(3.0);
        // window is 2 but all 3 retained samples count
        assert_eq!(avg.add(6.0), 3.0);
    }

    #[test]
    fn oldest_sample_is_evicted_at_capacity() {
        let mut avg = RollingAverage::new(1, 3);
        avg.add(100.0);
        avg.add(1.0);
        avg.add(2.0);
        assert_eq!(avg.add(3.0), 2.0);
        assert_eq!(avg.len(), 3);
        assert_eq!(avg.capacity(), 3);
    }

    #[test]
    fn capacity_never_below_window() {
        let avg = RollingAverage::new(20, 5);
        assert_eq!(avg.capacity(), 20);
        assert!(avg.is_empty());
        assert_eq!(avg.current(), None);
    }
}
