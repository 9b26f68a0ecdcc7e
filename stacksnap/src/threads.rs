//! Live thread enumeration via `/proc`.
//!
//! Reads `/proc/self/task/*/comm` to map every kernel thread of the current
//! process to its name. Entries come back in whatever order the kernel
//! lists them; no ordering is enforced.

#![allow(unsafe_code)] // gettid is a raw syscall

use anyhow::Result;
use std::fs;

use crate::domain::{self_pid, Pid, SnapshotError, Tid};

/// Placeholder rendered for threads with no registered name.
pub const NO_NAME: &str = "<no name>";

/// A live thread of the current process.
#[derive(Debug, Clone)]
pub struct ThreadInfo {
    pub tid: Tid,
    /// Thread name from `/proc/self/task/<tid>/comm`, if any.
    pub name: Option<String>,
}

impl ThreadInfo {
    /// Name to show in snapshot headers.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(NO_NAME)
    }
}

/// List all live threads of the current process.
///
/// # Errors
/// Returns an error if `/proc/self/task` cannot be read.
pub fn list_live_threads() -> Result<Vec<ThreadInfo>> {
    let pid = self_pid();
    let task_dir = format!("/proc/{}/task", pid.0);

    let entries =
        fs::read_dir(&task_dir).map_err(|source| SnapshotError::ThreadList { pid, source })?;

    let threads = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let tid = entry.file_name().to_string_lossy().parse::<u32>().ok()?;
            let tid = Tid(tid);
            Some(ThreadInfo { tid, name: thread_name(pid, tid) })
        })
        .collect();

    Ok(threads)
}

/// Kernel tid of the calling thread.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn current_tid() -> Tid {
    // SAFETY: gettid has no preconditions and cannot fail.
    let tid = unsafe { libc::syscall(libc::SYS_gettid) };
    Tid(tid as u32)
}

fn thread_name(pid: Pid, tid: Tid) -> Option<String> {
    let comm_path = format!("/proc/{}/task/{}/comm", pid.0, tid.0);
    let comm = fs::read_to_string(comm_path).ok()?;
    let comm = comm.trim();
    if comm.is_empty() {
        None
    } else {
        Some(comm.to_string())
    }
}
