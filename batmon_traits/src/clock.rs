use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall-clock abstraction used for calibration timestamps and tick pacing.
///
/// - unix_secs(): seconds since the Unix epoch (calibration is persisted in these units)
/// - sleep(): sleeps for the provided duration (implementations may simulate)
pub trait Clock {
    fn unix_secs(&self) -> u64;
    fn sleep(&self, d: Duration);
}

/// Real-time clock backed by `std::time::SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn unix_secs(&self) -> u64 {
        // A pre-epoch system time only happens on boards without an RTC before NTP sync.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Deterministic clock whose time can be advanced manually.
///
/// unix_secs() = start + accumulated offset
/// sleep(d) advances internal time by d without actually sleeping.
/// Clones share the same timeline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    start: u64,
    offset_ms: Arc<AtomicU64>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ManualClock {
    pub fn new(start_unix_secs: u64) -> Self {
        Self {
            start: start_unix_secs,
            offset_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: Duration) {
        let ms = u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
        let _ = self
            .offset_ms
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                Some(cur.saturating_add(ms))
            });
    }
}

impl Clock for ManualClock {
    fn unix_secs(&self) -> u64 {
        self.start
            .saturating_add(self.offset_ms.load(Ordering::Relaxed) / 1000)
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}
