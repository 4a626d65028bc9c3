//! Janitor - Background Expiration Sweeps
//!
//! Periodically sweeps expired entries out of every shard.
//!
//! # Design
//!
//! - Runs a Tokio interval loop on a dedicated thread, so the cache needs no
//!   ambient runtime
//! - Holds only a `Weak` reference to what it sweeps; once the cache core is
//!   gone the loop exits on its own
//! - Stopping is a one-shot signal followed by a join; a second stop is a no-op.
//!   Stopping from the janitor thread itself (the last cache handle dropped
//!   inside an eviction callback) only signals

use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::error::Result;

/// Something the janitor can sweep
pub(crate) trait Sweep: Send + Sync + 'static {
    /// Remove expired entries, returning how many were removed
    fn sweep(&self) -> usize;
}

/// Longest sweep period the timer is given, roughly 30 years
const MAX_PERIOD: Duration = Duration::from_secs(86400 * 365 * 30);

/// Handle to a running janitor
pub(crate) struct Janitor {
    interval: Duration,
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Janitor {
    /// Start sweeping `target` every `interval`
    pub(crate) fn start<S: Sweep>(interval: Duration, target: Weak<S>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let (stop_tx, stop_rx) = oneshot::channel();

        let handle = thread::Builder::new()
            .name("shardcache-janitor".to_string())
            .spawn(move || runtime.block_on(run(interval, target, stop_rx)))?;

        info!("Started janitor with interval {:?}", interval);

        Ok(Self {
            interval,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Sweep period
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the worker thread is still alive
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the loop to exit and wait for it
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // Err means the loop already exited
            let _ = tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            // Joining ourselves would deadlock; the loop sees the signal and exits
            if handle.thread().id() == thread::current().id() {
                debug!("Janitor stopped from its own thread, skipping join");
                return;
            }
            if handle.join().is_err() {
                error!("Janitor thread panicked");
            }
        }
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Janitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Janitor")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

async fn run<S: Sweep>(period: Duration, target: Weak<S>, mut stop_rx: oneshot::Receiver<()>) {
    // Instant arithmetic panics on overflow, here and in the tick schedule
    let period = period.min(MAX_PERIOD);

    // First sweep one full period after start
    let mut tick = interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            // Fires on an explicit stop and when the handle is dropped
            _ = &mut stop_rx => {
                info!("Janitor shutting down");
                break;
            }

            _ = tick.tick() => {
                let Some(target) = target.upgrade() else {
                    info!("Janitor target dropped, shutting down");
                    break;
                };

                let removed = target.sweep();
                if removed > 0 {
                    debug!("Janitor swept {} expired entries", removed);
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
