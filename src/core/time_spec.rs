use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::CancellationSignal;

/// Longest single sleep taken while waiting for a scheduled time
const SLEEP_SLICE: Duration = Duration::from_millis(1);

/// Absolute device-clock timestamp in seconds
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct TimeSpec(f64);

impl TimeSpec {
    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }

    pub fn offset(&self, secs: f64) -> Self {
        Self(self.0 + secs)
    }

    /// Time remaining from `now` until this timestamp, zero if already passed
    pub fn remaining_from(&self, now: TimeSpec) -> Duration {
        let delta = self.0 - now.0;
        if delta > 0.0 {
            Duration::from_secs_f64(delta)
        } else {
            Duration::ZERO
        }
    }
}

/// Authoritative time source shared by every participant of a run.
///
/// When the device has its own clock, implementations must report that
/// clock rather than the host's.
pub trait DeviceClock: Send + Sync {
    /// Current device time
    fn now(&self) -> TimeSpec;

    /// Block until `target` is reached or `cancel` is raised.
    ///
    /// Sleeps in bounded slices so a cancelled run is observed promptly.
    /// Returns `true` when the target time was reached.
    fn sleep_until(&self, target: TimeSpec, cancel: &CancellationSignal) -> bool {
        loop {
            if cancel.is_set() {
                return false;
            }
            let remaining = target.remaining_from(self.now());
            if remaining.is_zero() {
                return true;
            }
            std::thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}

/// Host monotonic clock with its epoch at construction (device time 0.0)
#[derive(Debug, Clone)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceClock for SystemClock {
    fn now(&self) -> TimeSpec {
        TimeSpec(self.epoch.elapsed().as_secs_f64())
    }
}

/// Clock that only moves when told to. Used to drive workers from tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: TimeSpec) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(start.as_secs().to_bits())),
        }
    }

    pub fn set(&self, time: TimeSpec) {
        self.bits.store(time.as_secs().to_bits(), Ordering::Release);
    }

    pub fn advance(&self, secs: f64) {
        let now = self.now();
        self.set(now.offset(secs));
    }
}

impl DeviceClock for ManualClock {
    fn now(&self) -> TimeSpec {
        TimeSpec(f64::from_bits(self.bits.load(Ordering::Acquire)))
    }
}

/// Resolves the shared start time of a run from one authoritative clock
#[derive(Clone)]
pub struct ScheduleClock {
    clock: Arc<dyn DeviceClock>,
}

impl ScheduleClock {
    pub fn new(clock: Arc<dyn DeviceClock>) -> Self {
        Self { clock }
    }

    pub fn now(&self) -> TimeSpec {
        self.clock.now()
    }

    /// `now() + lead_seconds`
    pub fn schedule(&self, lead_seconds: f64) -> TimeSpec {
        self.clock.now().offset(lead_seconds)
    }

    /// Handle to the underlying clock for the workers
    pub fn clock(&self) -> Arc<dyn DeviceClock> {
        self.clock.clone()
    }
}
