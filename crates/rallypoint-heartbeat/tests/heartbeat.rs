//! Integration tests for the heartbeat scheduler and task.
//!
//! Uses `start_paused = true` so Tokio's clock only moves when every
//! task is idle. Sleeping in the test advances time instantly and
//! deterministically.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rallypoint_heartbeat::{
    HeartbeatConfig, HeartbeatExit, HeartbeatScheduler, spawn_heartbeat,
};

// =========================================================================
// Helpers
// =========================================================================

fn config_15s() -> HeartbeatConfig {
    HeartbeatConfig {
        initial_jitter: Duration::ZERO,
        ..HeartbeatConfig::default()
    }
}

/// A beat closure that counts calls and always succeeds.
fn counting_beat(
    counter: Arc<AtomicU64>,
) -> impl FnMut() -> std::future::Ready<Result<(), String>> + Send + 'static {
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Ok(()))
    }
}

/// The timer wheel has millisecond resolution, so paused-clock deadlines
/// can land slightly past the exact instant.
fn assert_near(actual: Duration, expected: Duration) {
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(5),
        "expected ~{expected:?}, got {actual:?}"
    );
}

// =========================================================================
// HeartbeatConfig
// =========================================================================

#[test]
fn test_default_config() {
    let cfg = HeartbeatConfig::default();
    assert_eq!(cfg.interval, Duration::from_secs(15));
    assert_eq!(cfg.post_update_delay, Duration::from_secs(1));
    assert_eq!(cfg.max_consecutive_failures, 5);
}

#[test]
fn test_validated_clamps_interval() {
    let too_fast = HeartbeatConfig::with_interval(Duration::from_millis(10)).validated();
    assert_eq!(too_fast.interval, HeartbeatConfig::MIN_INTERVAL);

    let too_slow = HeartbeatConfig::with_interval(Duration::from_secs(600)).validated();
    assert_eq!(too_slow.interval, HeartbeatConfig::MAX_INTERVAL);
}

#[test]
fn test_validated_caps_post_update_delay_at_interval() {
    let cfg = HeartbeatConfig {
        interval: Duration::from_secs(2),
        post_update_delay: Duration::from_secs(10),
        ..HeartbeatConfig::default()
    }
    .validated();
    assert_eq!(cfg.post_update_delay, Duration::from_secs(2));
}

// =========================================================================
// Scheduler
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_scheduler_beats_every_interval() {
    let mut s = HeartbeatScheduler::new(config_15s());
    let start = tokio::time::Instant::now();

    let first = s.wait_for_beat().await;
    assert_eq!(first.beat, 1);
    assert!(!first.nudged);
    assert_near(start.elapsed(), Duration::from_secs(15));

    s.wait_for_beat().await;
    assert_near(start.elapsed(), Duration::from_secs(30));
    assert_eq!(s.beat_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_sub_microsecond_jitter_is_ignored() {
    let config = HeartbeatConfig {
        initial_jitter: Duration::from_nanos(500),
        ..HeartbeatConfig::default()
    };
    let start = tokio::time::Instant::now();
    let s = HeartbeatScheduler::new(config);
    assert_eq!(s.next_beat() - start, Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn test_nudge_pulls_next_beat_forward() {
    let mut s = HeartbeatScheduler::new(config_15s());
    let start = tokio::time::Instant::now();

    s.nudge();
    let info = s.wait_for_beat().await;
    assert!(info.nudged);
    assert_near(start.elapsed(), Duration::from_secs(1));

    // Regular cadence resumes from the nudged beat.
    let info = s.wait_for_beat().await;
    assert!(!info.nudged);
    assert_near(start.elapsed(), Duration::from_secs(16));
}

#[tokio::test(start_paused = true)]
async fn test_nudge_never_delays_an_earlier_beat() {
    let mut s = HeartbeatScheduler::new(HeartbeatConfig {
        interval: Duration::from_secs(2),
        post_update_delay: Duration::from_secs(2),
        initial_jitter: Duration::ZERO,
        ..HeartbeatConfig::default()
    });
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let before = s.next_beat();
    s.nudge();
    assert_eq!(s.next_beat(), before);
    assert_eq!(s.metrics().nudges, 1);
}

#[tokio::test(start_paused = true)]
async fn test_paused_scheduler_never_fires() {
    let mut s = HeartbeatScheduler::new(config_15s());
    s.pause();
    assert!(s.is_paused());

    let result = tokio::time::timeout(Duration::from_secs(120), s.wait_for_beat()).await;
    assert!(result.is_err(), "paused scheduler should pend");
}

#[tokio::test(start_paused = true)]
async fn test_pause_resume_idempotent() {
    let mut s = HeartbeatScheduler::new(config_15s());
    s.pause();
    s.pause();
    assert!(s.is_paused());
    s.resume();
    s.resume();
    assert!(!s.is_paused());

    let info = s.wait_for_beat().await;
    assert_eq!(info.beat, 1);
}

#[test]
fn test_failure_budget() {
    let mut s = HeartbeatScheduler::new(HeartbeatConfig {
        max_consecutive_failures: 2,
        ..HeartbeatConfig::default()
    });
    assert!(!s.record_failure());
    s.record_success();
    assert!(!s.record_failure());
    assert!(s.record_failure());
    assert_eq!(s.metrics().total_failures, 3);
    assert_eq!(s.metrics().consecutive_failures, 2);
}

#[test]
fn test_zero_failure_budget_never_gives_up() {
    let mut s = HeartbeatScheduler::new(HeartbeatConfig {
        max_consecutive_failures: 0,
        ..HeartbeatConfig::default()
    });
    for _ in 0..100 {
        assert!(!s.record_failure());
    }
}

// =========================================================================
// Spawned task
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_task_beats_for_whole_lifetime() {
    let counter = Arc::new(AtomicU64::new(0));
    let handle = spawn_heartbeat("lobby-1", config_15s(), counting_beat(Arc::clone(&counter)));

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 4);

    let report = handle.stop().await.expect("task should report");
    assert_eq!(report.exit, HeartbeatExit::Stopped);
    assert_eq!(report.metrics.total_beats, 4);
}

#[tokio::test(start_paused = true)]
async fn test_task_nudge_beats_after_post_update_delay() {
    let counter = Arc::new(AtomicU64::new(0));
    let handle = spawn_heartbeat("lobby-2", config_15s(), counting_beat(Arc::clone(&counter)));

    handle.nudge();
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_task_gives_up_after_consecutive_failures() {
    let handle = spawn_heartbeat(
        "lobby-3",
        HeartbeatConfig {
            max_consecutive_failures: 3,
            ..config_15s()
        },
        || std::future::ready(Err::<(), _>("lobby not found")),
    );

    tokio::time::sleep(Duration::from_secs(50)).await;
    assert!(handle.is_finished());

    let report = handle.stop().await.expect("task should report");
    assert_eq!(report.exit, HeartbeatExit::GaveUp);
    assert_eq!(report.metrics.total_failures, 3);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_stops_beats() {
    let counter = Arc::new(AtomicU64::new(0));
    let handle = spawn_heartbeat("lobby-4", config_15s(), counting_beat(Arc::clone(&counter)));

    tokio::time::sleep(Duration::from_secs(16)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    drop(handle);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_paused_task_skips_beats_until_resumed() {
    let counter = Arc::new(AtomicU64::new(0));
    let handle = spawn_heartbeat("lobby-5", config_15s(), counting_beat(Arc::clone(&counter)));

    handle.pause();
    tokio::time::sleep(Duration::from_secs(40)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    handle.resume();
    tokio::time::sleep(Duration::from_secs(16)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}
