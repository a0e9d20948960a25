//! Loop watchdog
//!
//! A stalled control loop (typically wedged inside a transport call) is
//! fatal: the monitor aborts the process and the supervisor restarts it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Something the control loop must feed to prove it is alive
pub trait Watchdog: Send {
    /// Reset the starvation timer
    fn feed(&mut self);
}

#[derive(Debug)]
struct FeedState {
    start: Instant,
    /// Milliseconds since `start` at the last feed
    last_feed_ms: AtomicU64,
    feeds: AtomicU64,
}

impl FeedState {
    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Watchdog whose monitor runs on a dedicated thread
#[derive(Debug, Clone)]
pub struct ThreadWatchdog {
    state: Arc<FeedState>,
}

impl ThreadWatchdog {
    /// Create a watchdog, counted as fed now
    pub fn new() -> Self {
        Self {
            state: Arc::new(FeedState {
                start: Instant::now(),
                last_feed_ms: AtomicU64::new(0),
                feeds: AtomicU64::new(0),
            }),
        }
    }

    /// Time since the last feed
    pub fn since_last_feed(&self) -> Duration {
        let last = self.state.last_feed_ms.load(Ordering::Relaxed);
        Duration::from_millis(self.state.elapsed_ms().saturating_sub(last))
    }

    /// Check whether the loop has gone `timeout` without feeding
    pub fn is_starved(&self, timeout: Duration) -> bool {
        self.since_last_feed() > timeout
    }

    /// Number of feeds so far
    pub fn feeds(&self) -> u64 {
        self.state.feeds.load(Ordering::Relaxed)
    }

    /// Spawn the monitor on its own OS thread, so a wedged loop cannot
    /// starve it. It aborts the process once the loop starves.
    pub fn spawn_monitor(&self, timeout: Duration) -> std::thread::JoinHandle<()> {
        let watchdog = self.clone();
        info!("Watchdog armed: {:?}", timeout);
        std::thread::spawn(move || {
            let period = (timeout / 4).max(Duration::from_millis(10));
            loop {
                std::thread::sleep(period);
                watchdog.check(timeout);
            }
        })
    }

    fn check(&self, timeout: Duration) {
        if self.is_starved(timeout) {
            error!(
                "Watchdog starved for {:?} (timeout {:?}), aborting",
                self.since_last_feed(),
                timeout
            );
            std::process::abort();
        }
    }
}

impl Default for ThreadWatchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Watchdog for ThreadWatchdog {
    fn feed(&mut self) {
        self.state
            .last_feed_ms
            .store(self.state.elapsed_ms(), Ordering::Relaxed);
        self.state.feeds.fetch_add(1, Ordering::Relaxed);
    }
}
