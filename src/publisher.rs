//! The state publisher: owns the refresh cadence and the observable cell.
//!
//! A `Session` is constructed from a validated configuration, computes one
//! snapshot immediately, and (in push-driven mode) keeps republishing on a
//! fixed interval from a single named thread until disposed. Refresh ticks
//! never overlap: the tick body is synchronous and runs on one thread.
//!
//! Disposal is explicit and immediate — `dispose()` (also run on `Drop`)
//! stops the timer and joins the thread, after which no further writes to
//! the cell occur. Consumers holding an earlier snapshot keep it.

use crate::cell::SnapshotCell;
use crate::clock::{Clock, GlobalClock};
use crate::config::SequencerConfig;
use crate::resolver::resolve_config;
use crate::types::Snapshot;
use crossbeam_channel::{bounded, select, tick, Sender};
use log::{debug, info, trace};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// One resolver session: validated configuration + clock + observable cell.
///
/// Sessions are fully isolated from each other; two sessions share nothing
/// but the global clock formula.
pub struct Session {
    config: Arc<SequencerConfig>,
    clock: Arc<dyn Clock>,
    cell: SnapshotCell,
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Session {
    /// Push-driven session on the production global clock.
    pub fn new(config: SequencerConfig) -> Result<Self, String> {
        Self::with_clock(config, Arc::new(GlobalClock::new()))
    }

    /// Push-driven session on an injected clock.
    pub fn with_clock(config: SequencerConfig, clock: Arc<dyn Clock>) -> Result<Self, String> {
        let mut session = Self::manual_with_clock(config, clock)?;
        session.start_refresh_thread()?;
        Ok(session)
    }

    /// Pull-driven session: no timer is scheduled; the caller drives
    /// recomputation through `refresh_now()`.
    pub fn manual(config: SequencerConfig) -> Result<Self, String> {
        Self::manual_with_clock(config, Arc::new(GlobalClock::new()))
    }

    /// Pull-driven session on an injected clock.
    pub fn manual_with_clock(
        config: SequencerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, String> {
        // Validation is the only failure point; nothing is created before
        // it passes.
        config.validate()?;

        let config = Arc::new(config);
        // First snapshot is computed immediately, before any timer exists.
        let initial = resolve_config(clock.now_seconds(), &config);
        let cell = SnapshotCell::new(initial);

        Ok(Self {
            config,
            clock,
            cell,
            shutdown_tx: None,
            handle: None,
        })
    }

    fn start_refresh_thread(&mut self) -> Result<(), String> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let interval = Duration::from_millis(self.config.refresh_interval_ms);
        let config = self.config.clone();
        let clock = self.clock.clone();
        let cell = self.cell.clone();

        let handle = thread::Builder::new()
            .name("loopwatch-refresh".into())
            .spawn(move || {
                info!(
                    "session refresh running: bpm={} notes={} interval={:?}",
                    config.bpm,
                    config.notes.len(),
                    interval
                );
                let ticker = tick(interval);
                let mut refresh_count: u64 = 0;
                loop {
                    select! {
                        recv(ticker) -> _ => {
                            let snapshot = resolve_config(clock.now_seconds(), &config);
                            trace!("refresh: {}", snapshot);
                            cell.publish(snapshot);
                            refresh_count += 1;
                            if refresh_count % 1000 == 0 {
                                debug!("session: {} refreshes", refresh_count);
                            }
                        }
                        recv(shutdown_rx) -> _ => break,
                    }
                }
                info!("session refresh stopped after {} refreshes", refresh_count);
            })
            .map_err(|e| format!("spawn refresh thread: {}", e))?;

        self.shutdown_tx = Some(shutdown_tx);
        self.handle = Some(handle);
        Ok(())
    }

    /// The observable cell. Clone it freely; readers never block the
    /// publisher beyond the brief value swap.
    pub fn cell(&self) -> &SnapshotCell {
        &self.cell
    }

    /// The latest snapshot (shorthand for `cell().get()`).
    pub fn snapshot(&self) -> Snapshot {
        self.cell.get()
    }

    /// Recompute from the current clock value and publish, in the caller's
    /// thread. The refresh path of pull-driven sessions; also usable on
    /// push-driven ones for an off-cadence refresh.
    pub fn refresh_now(&self) -> Snapshot {
        let snapshot = resolve_config(self.clock.now_seconds(), &self.config);
        self.cell.publish(snapshot.clone());
        snapshot
    }

    /// Stop the refresh timer and wait for the thread to exit. Idempotent;
    /// after it returns, no further writes to the cell occur.
    pub fn dispose(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

// The clock is a trait object, so Debug is written out by hand.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("running", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.dispose();
    }
}
