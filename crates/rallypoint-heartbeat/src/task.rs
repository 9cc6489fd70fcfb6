//! The heartbeat task: a scheduler driven inside its own Tokio task.

use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, trace, warn};

use crate::{HeartbeatConfig, HeartbeatMetrics, HeartbeatScheduler};

/// Commands sent from a [`HeartbeatHandle`] to its task.
#[derive(Debug)]
enum HeartbeatCommand {
    Nudge,
    Pause,
    Resume,
    Stop,
}

/// Why a heartbeat task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatExit {
    /// [`HeartbeatHandle::stop`] was called.
    Stopped,
    /// Too many consecutive beats failed.
    GaveUp,
    /// The command channel closed without a stop command.
    HandleDropped,
}

/// Final state of a finished heartbeat task.
#[derive(Debug, Clone)]
pub struct HeartbeatReport {
    pub exit: HeartbeatExit,
    pub metrics: HeartbeatMetrics,
}

/// Owner of a running heartbeat task.
///
/// Dropping the handle aborts the task. That way a heartbeat can't
/// outlive the coordinator that started it.
#[derive(Debug)]
pub struct HeartbeatHandle {
    commands: mpsc::UnboundedSender<HeartbeatCommand>,
    task: Option<JoinHandle<HeartbeatReport>>,
}

impl HeartbeatHandle {
    /// Schedules a beat shortly, after a lobby mutation.
    pub fn nudge(&self) {
        self.send(HeartbeatCommand::Nudge);
    }

    pub fn pause(&self) {
        self.send(HeartbeatCommand::Pause);
    }

    pub fn resume(&self) {
        self.send(HeartbeatCommand::Resume);
    }

    /// Whether the task has ended (stopped, gave up, or aborted).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stops the task and waits for its report.
    ///
    /// Returns `None` if the task panicked or was already aborted.
    pub async fn stop(mut self) -> Option<HeartbeatReport> {
        self.send(HeartbeatCommand::Stop);
        let task = self.task.take()?;
        task.await.ok()
    }

    fn send(&self, command: HeartbeatCommand) {
        // A closed channel means the task already ended; nothing to do.
        let _ = self.commands.send(command);
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Spawns a heartbeat task that calls `beat` every time a beat is due.
///
/// `label` only appears in logs (typically the lobby id). A failed beat
/// is logged and counted. After `max_consecutive_failures` failures in a
/// row the task ends with [`HeartbeatExit::GaveUp`].
pub fn spawn_heartbeat<F, Fut, E>(
    label: impl Into<String>,
    config: HeartbeatConfig,
    beat: F,
) -> HeartbeatHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let scheduler = HeartbeatScheduler::new(config);
    let task = tokio::spawn(run(label.into(), scheduler, beat, rx));

    HeartbeatHandle {
        commands: tx,
        task: Some(task),
    }
}

async fn run<F, Fut, E>(
    label: String,
    mut scheduler: HeartbeatScheduler,
    mut beat: F,
    mut commands: mpsc::UnboundedReceiver<HeartbeatCommand>,
) -> HeartbeatReport
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: fmt::Display,
{
    info!(%label, "heartbeat started");

    let exit = loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(HeartbeatCommand::Nudge) => scheduler.nudge(),
                Some(HeartbeatCommand::Pause) => scheduler.pause(),
                Some(HeartbeatCommand::Resume) => scheduler.resume(),
                Some(HeartbeatCommand::Stop) => break HeartbeatExit::Stopped,
                None => break HeartbeatExit::HandleDropped,
            },
            info = scheduler.wait_for_beat() => {
                match beat().await {
                    Ok(()) => {
                        scheduler.record_success();
                        trace!(%label, beat = info.beat, nudged = info.nudged, "heartbeat sent");
                    }
                    Err(e) => {
                        warn!(%label, beat = info.beat, error = %e, "heartbeat failed");
                        if scheduler.record_failure() {
                            error!(
                                %label,
                                failures = scheduler.metrics().consecutive_failures,
                                "heartbeat giving up"
                            );
                            break HeartbeatExit::GaveUp;
                        }
                    }
                }
            }
        }
    };

    info!(%label, ?exit, beats = scheduler.beat_count(), "heartbeat ended");

    HeartbeatReport {
        exit,
        metrics: scheduler.metrics().clone(),
    }
}
