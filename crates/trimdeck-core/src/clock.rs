//! Monotonic clocks in seconds.
//!
//! The transport never counts frames to advance the playhead; it reads a
//! clock. Production code uses [`SystemClock`], tests drive a
//! [`ManualClock`] by hand.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// A source of monotonic time in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn shared() -> SharedClock {
        Arc::new(Self::new())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Move time forward by `dt` seconds.
    pub fn advance(&self, dt: f64) {
        let mut now = self.now.lock();
        *now += dt.max(0.0);
    }

    /// Jump to an absolute time. Going backwards is ignored.
    pub fn set(&self, t: f64) {
        let mut now = self.now.lock();
        if t > *now {
            *now = t;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}
