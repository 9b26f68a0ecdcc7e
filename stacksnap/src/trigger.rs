//! On-demand dump trigger.
//!
//! Installs a listener for [`DUMP_SIGNAL`] (SIGUSR2). The OS handler
//! context does nothing beyond signal-hook's wakeup write; a dedicated
//! listener thread performs the snapshot and the terminal write, so no
//! unbounded work runs in async-signal context. Sending the signal to the
//! process produces exactly one dump per delivery.

use std::fs::OpenOptions;
use std::io::{LineWriter, Write};
use std::sync::Mutex;
use std::thread;

use anyhow::Result;
use log::{error, info};
use signal_hook::iterator::Signals;

use crate::domain::SnapshotError;
use crate::snapshot;

/// Signal that triggers an on-demand dump (the second user signal).
pub const DUMP_SIGNAL: i32 = signal_hook::consts::SIGUSR2;

/// Label prefixed to dumps routed to the log sink.
pub const ON_DEMAND_LABEL: &str = "ON-DEMAND THREAD DUMP";

/// Path of the controlling terminal device.
const TTY_PATH: &str = "/dev/tty";

/// Where a signal-triggered dump is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpTarget {
    /// The process's controlling terminal, opened write-only with line
    /// buffering and closed after the write.
    #[default]
    ControllingTty,
    /// The `log` facade at info level, for daemonized processes that have
    /// no controlling terminal.
    Log,
}

/// The listener installed by the last `install_handler*` call.
static LISTENER: Mutex<Option<signal_hook::iterator::Handle>> = Mutex::new(None);

/// Install the dump listener, writing to the controlling terminal.
///
/// Re-installing replaces any listener this module installed before, so
/// each delivered signal still produces exactly one dump.
///
/// # Errors
/// Returns an error if the signal cannot be registered or the listener
/// thread cannot be spawned.
pub fn install_handler() -> Result<()> {
    install_handler_to(DumpTarget::default())
}

/// Install the dump listener, writing to `target`.
///
/// # Errors
/// Returns an error if the signal cannot be registered or the listener
/// thread cannot be spawned.
pub fn install_handler_to(target: DumpTarget) -> Result<()> {
    let mut signals = Signals::new([DUMP_SIGNAL])?;
    let handle = signals.handle();

    thread::Builder::new().name("stacksnap-dump".into()).spawn(move || {
        for signal in signals.forever() {
            debug_assert_eq!(signal, DUMP_SIGNAL);
            if let Err(e) = dump_once(target) {
                error!("thread dump failed: {e:#}");
            }
        }
    })?;

    let mut slot = LISTENER.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Some(prev) = slot.replace(handle) {
        prev.close();
    }
    Ok(())
}

/// Produce one snapshot and write it to `target`.
fn dump_once(target: DumpTarget) -> Result<()> {
    let snap = snapshot::get_snapshot()?;
    match target {
        DumpTarget::ControllingTty => {
            let tty = OpenOptions::new()
                .write(true)
                .open(TTY_PATH)
                .map_err(|source| SnapshotError::TtyOpen { path: TTY_PATH, source })?;
            let mut out = LineWriter::new(tty);
            out.write_all(snap.as_bytes())?;
            out.flush()?;
        }
        DumpTarget::Log => info!("{ON_DEMAND_LABEL}\n\n{snap}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_target_is_controlling_tty() {
        assert_eq!(DumpTarget::default(), DumpTarget::ControllingTty);
    }
}
