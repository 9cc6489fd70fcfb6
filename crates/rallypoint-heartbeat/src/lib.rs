//! Recurring lobby liveness for Rallypoint.
//!
//! Hosted lobby providers mark a lobby inactive when its host stops
//! sending heartbeats, and purge it soon after. A host therefore has to
//! keep beating for as long as it hosts, not just once after creating
//! the lobby.
//!
//! This crate has two layers:
//!
//! - [`HeartbeatScheduler`] decides *when* the next beat is due: a fixed
//!   interval, a short post-update delay when nudged, pause/resume, and
//!   failure accounting.
//! - [`spawn_heartbeat`] runs a scheduler inside its own Tokio task and
//!   calls a user-supplied closure on every beat. The returned
//!   [`HeartbeatHandle`] is the only way to talk to the task; dropping it
//!   aborts the task.
//!
//! The closure keeps this crate independent of any particular lobby
//! service:
//!
//! ```ignore
//! let lobby = Arc::clone(&service);
//! let id = lobby_id.clone();
//! let handle = spawn_heartbeat(id.to_string(), HeartbeatConfig::default(), move || {
//!     let lobby = Arc::clone(&lobby);
//!     let id = id.clone();
//!     async move { lobby.send_heartbeat(&id).await }
//! });
//! // After changing lobby data:
//! handle.nudge();
//! ```

mod task;

pub use task::{HeartbeatExit, HeartbeatHandle, HeartbeatReport, spawn_heartbeat};

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a lobby heartbeat.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Time between regular beats.
    pub interval: Duration,
    /// How soon after a nudge (a host-side lobby mutation) the next beat
    /// fires. Never later than the regular schedule.
    pub post_update_delay: Duration,
    /// Random delay (0..max) added to the first beat so that lobbies
    /// created at the same instant don't beat in lockstep.
    pub initial_jitter: Duration,
    /// Consecutive failed beats after which the task gives up.
    /// 0 = never give up.
    pub max_consecutive_failures: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            post_update_delay: Duration::from_secs(1),
            initial_jitter: Duration::from_millis(500),
            max_consecutive_failures: 5,
        }
    }
}

impl HeartbeatConfig {
    /// Shortest accepted interval. Providers rate-limit heartbeats.
    pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

    /// Longest accepted interval. Providers typically consider a lobby
    /// inactive after 30 seconds of silence.
    pub const MAX_INTERVAL: Duration = Duration::from_secs(30);

    /// Default config with a specific interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamp any out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`HeartbeatScheduler::new`]. Rules:
    /// - `interval` clamped to `MIN_INTERVAL..=MAX_INTERVAL`.
    /// - `post_update_delay` forced ≤ `interval`.
    pub fn validated(mut self) -> Self {
        let clamped = self.interval.clamp(Self::MIN_INTERVAL, Self::MAX_INTERVAL);
        if clamped != self.interval {
            warn!(
                requested_ms = self.interval.as_millis() as u64,
                clamped_ms = clamped.as_millis() as u64,
                "heartbeat interval out of range, clamping"
            );
            self.interval = clamped;
        }
        if self.post_update_delay > self.interval {
            self.post_update_delay = self.interval;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Beat info / metrics
// ---------------------------------------------------------------------------

/// Information about a beat that just came due.
#[derive(Debug, Clone)]
pub struct BeatInfo {
    /// Monotonically increasing beat number (starts at 1).
    pub beat: u64,
    /// `true` if this beat was pulled forward by a nudge.
    pub nudged: bool,
}

/// Counters kept by the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeartbeatMetrics {
    /// Beats that came due.
    pub total_beats: u64,
    /// Beats whose heartbeat call failed.
    pub total_failures: u64,
    /// Failures since the last success.
    pub consecutive_failures: u32,
    /// Nudges received.
    pub nudges: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Decides when the next heartbeat is due.
///
/// Missed beats are never replayed. A lobby only needs to hear from its
/// host recently, not once per elapsed interval, so after a late wake-up
/// the next beat is scheduled one interval from now.
pub struct HeartbeatScheduler {
    config: HeartbeatConfig,
    next_beat: Instant,
    nudged: bool,
    beat_count: u64,
    paused: bool,
    metrics: HeartbeatMetrics,
}

impl HeartbeatScheduler {
    /// Create a new scheduler from config. The first beat is one
    /// interval (plus jitter) from now.
    pub fn new(config: HeartbeatConfig) -> Self {
        let config = config.validated();

        let max_us = config.initial_jitter.as_micros() as u64;
        let jitter = if max_us == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(rand::rng().random_range(0..max_us))
        };

        debug!(
            interval_ms = config.interval.as_millis() as u64,
            jitter_us = jitter.as_micros() as u64,
            "heartbeat scheduler created"
        );

        Self {
            next_beat: Instant::now() + config.interval + jitter,
            config,
            nudged: false,
            beat_count: 0,
            paused: false,
            metrics: HeartbeatMetrics::default(),
        }
    }

    /// Wait until the next beat is due.
    ///
    /// While paused this future pends forever, so `tokio::select!` keeps
    /// serving its other branches.
    pub async fn wait_for_beat(&mut self) -> BeatInfo {
        if self.paused {
            std::future::pending::<()>().await;
        }

        time::sleep_until(self.next_beat).await;

        self.beat_count += 1;
        self.metrics.total_beats += 1;
        let nudged = std::mem::take(&mut self.nudged);
        self.next_beat = Instant::now() + self.config.interval;

        trace!(beat = self.beat_count, nudged, "heartbeat due");

        BeatInfo {
            beat: self.beat_count,
            nudged,
        }
    }

    /// Pull the next beat forward to `now + post_update_delay`, unless it
    /// is already due sooner.
    pub fn nudge(&mut self) {
        self.metrics.nudges += 1;
        let at = Instant::now() + self.config.post_update_delay;
        if at < self.next_beat {
            self.next_beat = at;
            self.nudged = true;
        }
    }

    /// Record a successful heartbeat call.
    pub fn record_success(&mut self) {
        self.metrics.consecutive_failures = 0;
    }

    /// Record a failed heartbeat call. Returns `true` once the failure
    /// budget is exhausted.
    pub fn record_failure(&mut self) -> bool {
        self.metrics.total_failures += 1;
        self.metrics.consecutive_failures += 1;
        self.should_give_up()
    }

    /// Whether the configured failure budget is exhausted.
    pub fn should_give_up(&self) -> bool {
        self.config.max_consecutive_failures > 0
            && self.metrics.consecutive_failures >= self.config.max_consecutive_failures
    }

    /// Stop beating until [`resume`](Self::resume). Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(beat = self.beat_count, "heartbeat paused");
        }
    }

    /// Resume after a pause. The next beat is one interval from now.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.next_beat = Instant::now() + self.config.interval;
            debug!(beat = self.beat_count, "heartbeat resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Beats that came due so far.
    pub fn beat_count(&self) -> u64 {
        self.beat_count
    }

    /// When the next beat is due.
    pub fn next_beat(&self) -> Instant {
        self.next_beat
    }

    pub fn metrics(&self) -> &HeartbeatMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &HeartbeatConfig {
        &self.config
    }
}
