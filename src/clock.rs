//! Global clock: seconds since a fixed epoch shared by every instance.
//!
//! Determinism comes from the shared formula, not from message passing —
//! two sessions on two machines with synchronized wall clocks compute the
//! same loop position at the same real moment without any handshake.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

/// The shared epoch: 2024-01-01T00:00:00 UTC, as Unix seconds.
/// Every loopwatch instance everywhere measures time from this instant.
pub const GLOBAL_EPOCH_UNIX_SECONDS: f64 = 1_704_067_200.0;

/// A source of "now" in global-clock seconds.
///
/// May return negative values (wall clock before the epoch). Must be
/// monotonically non-decreasing with real time. Injectable so tests can
/// simulate the passage of time without real delays.
pub trait Clock: Send + Sync {
    fn now_seconds(&self) -> f64;
}

/// The production clock: wall-clock time minus the fixed shared epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalClock;

impl GlobalClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for GlobalClock {
    fn now_seconds(&self) -> f64 {
        let unix_seconds = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs_f64(),
            // Wall clock before 1970: negative Unix time
            Err(e) => -e.duration().as_secs_f64(),
        };
        unix_seconds - GLOBAL_EPOCH_UNIX_SECONDS
    }
}

/// Test clock: time advances only when told to.
///
/// Cloning shares the underlying value, so a clone handed to a session and
/// a clone kept by the test see the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    seconds: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new(seconds: f64) -> Self {
        Self {
            seconds: Arc::new(Mutex::new(seconds)),
        }
    }

    pub fn set(&self, seconds: f64) {
        *self.seconds.lock().unwrap() = seconds;
    }

    pub fn advance(&self, delta: f64) {
        *self.seconds.lock().unwrap() += delta;
    }
}

impl Clock for ManualClock {
    fn now_seconds(&self) -> f64 {
        *self.seconds.lock().unwrap()
    }
}
