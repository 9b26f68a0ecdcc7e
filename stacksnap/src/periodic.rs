//! Periodic snapshot logging.
//!
//! A background task that every [`DUMP_INTERVAL`] emits one info-level log
//! record carrying the full snapshot+diff text. The task never keeps the
//! process alive on its own; it dies with the runtime, or earlier when its
//! handle is cancelled.

use std::time::Duration;

use log::{info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::snapshot;

/// Fixed interval between periodic dumps.
pub const DUMP_INTERVAL: Duration = Duration::from_secs(5);

/// Label prefixed to every periodic log record.
pub const PERIODIC_LABEL: &str = "PERIODIC THREAD DUMP";

/// Handle to a running periodic dump task.
#[derive(Debug)]
pub struct PeriodicDump {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PeriodicDump {
    /// Ask the task to stop; returns without waiting.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel and wait for the task to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.task.await;
    }

    /// True once the task has been asked to stop.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Spawn the periodic logger on the ambient tokio runtime: sleep
/// [`DUMP_INTERVAL`], log one snapshot, repeat until cancelled.
///
/// Each snapshot briefly interrupts every live thread; at a 5 second
/// cadence the overhead is negligible.
///
/// # Panics
/// Panics if called outside a tokio runtime.
#[must_use]
pub fn dump_to_logger() -> PeriodicDump {
    spawn_periodic(DUMP_INTERVAL, snapshot::get_snapshot, |snap| {
        info!("{PERIODIC_LABEL}\n\n{snap}");
    })
}

/// Spawn a periodic dump with an explicit interval, producer and sink.
///
/// [`dump_to_logger`] wires this to [`snapshot::get_snapshot`] and the log
/// facade; tests drive it with a paused clock and an in-memory sink.
pub fn spawn_periodic<P, S>(interval: Duration, mut produce: P, mut sink: S) -> PeriodicDump
where
    P: FnMut() -> anyhow::Result<String> + Send + 'static,
    S: FnMut(String) + Send + 'static,
{
    let token = CancellationToken::new();
    let child = token.clone();
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                () = child.cancelled() => break,
                () = tokio::time::sleep(interval) => match produce() {
                    Ok(snap) => sink(snap),
                    Err(e) => warn!("periodic thread dump failed: {e:#}"),
                },
            }
        }
    });
    PeriodicDump { token, task }
}
