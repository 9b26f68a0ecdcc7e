//! Per-thread call stack capture.
//!
//! A thread cannot read another thread's stack directly, so capture works
//! by interrupting each target thread with an internal signal
//! ([`CAPTURE_SIGNAL`]): the handler runs on the interrupted thread,
//! records that thread's raw frame addresses and pushes them onto a
//! bounded channel, and the requesting thread resolves symbols once the
//! frames are back in ordinary execution context. The requesting thread
//! captures itself directly, without a signal round trip.
//!
//! The capture action allocates (frame buffer, channel slot), which is not
//! async-signal-safe in the strict sense. Accepted for a best-effort
//! diagnostic facility; the capture signal is only ever raised by this
//! module, against its own process.

#![allow(unsafe_code)] // signal registration and tgkill require libc

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, Sender};
use once_cell::sync::Lazy;

use crate::domain::{self_pid, SnapshotError, Tid};
use crate::threads::{self, current_tid, ThreadInfo};

/// Signal used internally to interrupt a thread for capture.
pub const CAPTURE_SIGNAL: libc::c_int = libc::SIGPROF;

/// How long to wait for one interrupted thread to hand back its frames.
/// A thread stuck in an uninterruptible syscall never answers; the
/// snapshot must not hang on it.
pub const CAPTURE_TIMEOUT: Duration = Duration::from_millis(200);

/// Upper bound on frames recorded per thread.
const MAX_FRAMES: usize = 128;

/// One resolved stack frame.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub ip: usize,
    pub function: Option<String>,
    pub file: Option<PathBuf>,
    pub line: Option<u32>,
}

/// The call stack captured for one thread, innermost frame first.
#[derive(Debug, Clone)]
pub struct ThreadStack {
    pub thread: ThreadInfo,
    /// Empty when the thread never answered the capture signal within
    /// [`CAPTURE_TIMEOUT`], or exited between listing and delivery.
    pub frames: Vec<CapturedFrame>,
}

/// Raw frames recorded on the interrupted thread, resolved later.
struct RawCapture {
    tid: Tid,
    ips: Vec<usize>,
}

// Handler -> requester handoff. Bounded so stale replies from timed-out
// rounds cannot grow the queue without limit.
static REPLIES: Lazy<(Sender<RawCapture>, Receiver<RawCapture>)> = Lazy::new(|| bounded(64));

// Serializes capture rounds so replies cannot be claimed by a concurrent
// snapshot.
static ROUND: Mutex<()> = Mutex::new(());

/// Capture the call stack of every live thread of this process.
///
/// Threads are visited in `/proc` listing order. Threads that never answer
/// the capture signal yield an empty frame list rather than blocking the
/// snapshot.
///
/// # Errors
/// Returns an error if the capture handler cannot be registered or the
/// thread list cannot be read.
pub fn capture_all() -> Result<Vec<ThreadStack>> {
    ensure_handler()?;
    let _round = ROUND.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

    // Drop replies left over from a previous timed-out round.
    while REPLIES.1.try_recv().is_ok() {}

    let threads = threads::list_live_threads()?;
    let me = current_tid();

    let mut stacks = Vec::with_capacity(threads.len());
    for info in threads {
        let frames = if info.tid == me {
            resolve_frames(&trace_ips())
        } else {
            captured_frames(info.tid)
        };
        stacks.push(ThreadStack { thread: info, frames });
    }
    Ok(stacks)
}

/// Register the capture-signal action once per process.
fn ensure_handler() -> Result<(), SnapshotError> {
    static REGISTERED: Lazy<Result<signal_hook_registry::SigId, String>> = Lazy::new(|| {
        // SAFETY: the action only records frame addresses and pushes onto a
        // pre-created channel; see the module docs for the signal-safety
        // caveat.
        unsafe { signal_hook_registry::register(CAPTURE_SIGNAL, capture_action) }
            .map_err(|e| e.to_string())
    });

    match &*REGISTERED {
        Ok(_) => Ok(()),
        Err(e) => Err(SnapshotError::HandlerInstall(e.clone())),
    }
}

/// Runs on the interrupted thread, in signal context.
fn capture_action() {
    let raw = RawCapture { tid: current_tid(), ips: trace_ips() };
    let _ = REPLIES.0.try_send(raw);
}

/// Record the calling thread's raw frame addresses, innermost first.
fn trace_ips() -> Vec<usize> {
    let mut ips = Vec::with_capacity(MAX_FRAMES);
    backtrace::trace(|frame| {
        ips.push(frame.ip() as usize);
        ips.len() < MAX_FRAMES
    });
    ips
}

/// Interrupt one thread and wait for its frames.
fn captured_frames(tid: Tid) -> Vec<CapturedFrame> {
    if interrupt(tid).is_err() {
        // Thread exited between listing and delivery.
        return Vec::new();
    }

    let deadline = Instant::now() + CAPTURE_TIMEOUT;
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Vec::new();
        }
        match REPLIES.1.recv_timeout(deadline - now) {
            Ok(raw) if raw.tid == tid => return resolve_frames(&raw.ips),
            // Late reply from a thread this round already gave up on.
            Ok(_) => {}
            Err(_) => return Vec::new(),
        }
    }
}

/// Deliver [`CAPTURE_SIGNAL`] to one thread of this process.
fn interrupt(tid: Tid) -> Result<(), SnapshotError> {
    let pid = self_pid();
    // SAFETY: tgkill against our own thread group; no memory is touched.
    let rc = unsafe {
        libc::syscall(
            libc::SYS_tgkill,
            libc::c_long::from(pid.0),
            libc::c_long::from(tid.0),
            libc::c_long::from(CAPTURE_SIGNAL),
        )
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(SnapshotError::CaptureSignal(tid))
    }
}

/// Resolve raw frame addresses to symbols, off the signal path.
///
/// One address can expand to several frames when the compiler inlined
/// calls; each inlined level is kept.
fn resolve_frames(ips: &[usize]) -> Vec<CapturedFrame> {
    let mut frames = Vec::with_capacity(ips.len());
    for &ip in ips {
        let before = frames.len();
        backtrace::resolve(ip as *mut libc::c_void, |symbol| {
            frames.push(CapturedFrame {
                ip,
                function: symbol.name().map(|n| n.to_string()),
                file: symbol.filename().map(Path::to_path_buf),
                line: symbol.lineno(),
            });
        });
        if frames.len() == before {
            frames.push(CapturedFrame { ip, function: None, file: None, line: None });
        }
    }
    frames
}
