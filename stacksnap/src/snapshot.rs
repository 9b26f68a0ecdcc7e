//! Snapshot formatting and history.
//!
//! Renders every live thread's captured stack as one text report and keeps
//! the most recent report for diffing. The report shape: a header line per
//! thread (pid, thread name, tid, raw stack representation), then one
//! `File: ...` line per visible frame, outermost first, each followed by an
//! indented copy of the source line when the file is readable. Blank line
//! between thread blocks, two blank lines bookending the report.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;

use crate::capture::{self, CapturedFrame, ThreadStack};
use crate::diff;
use crate::domain::self_pid;

/// Marker appended when two consecutive snapshots are identical.
pub const NO_CHANGE_MARKER: &str = "(no change since last time)";

/// Diff labels for the previous and current snapshot.
const FROM_LABEL: &str = "then";
const TO_LABEL: &str = "now";

/// Innermost frames contributed by the snapshot routine itself: the
/// capture call plus the unwinder invocation beneath it. These belong to
/// the snapshotter, not the thread's real call site, and are never shown.
/// Deeper machinery frames (signal trampoline, wrapper closures) are
/// pruned by signature instead, so this count only covers the fixed part
/// of the call depth.
pub(crate) const CAPTURE_FRAMES: usize = 2;

/// Symbol fragments that mark a frame as capture machinery rather than
/// application code.
const CAPTURE_SIGNATURES: &[&str] = &[
    "stacksnap::capture",
    "stacksnap::snapshot",
    "signal_hook_registry",
    "backtrace::",
    "__restore_rt",
];

/// Format the call stack of every live thread as one text report.
///
/// Pure read of process state; no history side effect. Calling this twice
/// for an unchanged thread set produces byte-identical text.
///
/// # Errors
/// Returns an error if threads cannot be listed or the capture handler
/// cannot be registered.
pub fn format_stacks() -> Result<String> {
    let stacks = capture::capture_all()?;
    Ok(render(&stacks))
}

/// Owns the most recent snapshot text and produces record-and-diff
/// snapshots as a single atomic operation.
///
/// A process-wide instance backs [`get_snapshot`]; tests construct their
/// own to keep history isolated.
#[derive(Debug)]
pub struct Snapshotter {
    last: Mutex<Option<String>>,
}

impl Snapshotter {
    #[must_use]
    pub const fn new() -> Self {
        Self { last: Mutex::new(None) }
    }

    /// Format all stacks and diff against the previous snapshot.
    ///
    /// The stored history is unconditionally overwritten with the new
    /// pre-diff text. The diff (or the no-change marker) is appended only
    /// when a previous snapshot exists. Holding the lock across
    /// diff-and-record keeps concurrent trigger/periodic callers from
    /// interleaving the read-compute-write sequence.
    ///
    /// # Errors
    /// Propagates [`format_stacks`] failures; the stored history is left
    /// untouched in that case.
    pub fn snapshot(&self) -> Result<String> {
        let current = format_stacks()?;
        Ok(self.record_and_diff(current))
    }

    fn record_and_diff(&self, current: String) -> String {
        let mut last = self.last.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut snap = current.clone();
        if let Some(prev) = last.as_ref() {
            snap.push('\n');
            let d = diff::unified_diff(prev, &current, FROM_LABEL, TO_LABEL);
            if d.is_empty() {
                snap.push_str(NO_CHANGE_MARKER);
                snap.push('\n');
            } else {
                snap.push_str(&d);
            }
        }
        *last = Some(current);
        snap
    }
}

impl Default for Snapshotter {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide snapshot history backing [`get_snapshot`].
static HISTORY: Snapshotter = Snapshotter::new();

/// Format all stacks and diff against the process-wide previous snapshot.
///
/// # Errors
/// Propagates [`format_stacks`] failures.
pub fn get_snapshot() -> Result<String> {
    HISTORY.snapshot()
}

/// Render captured stacks into the report text.
fn render(stacks: &[ThreadStack]) -> String {
    let pid = self_pid();
    let mut sources = SourceCache::default();

    let mut lines: Vec<String> = vec![String::new(), String::new()];
    for stack in stacks {
        lines.push(format!(
            "# PID {} ThreadID: ({}) {}; <stack of {} frames>",
            pid.0,
            stack.thread.display_name(),
            stack.thread.tid.0,
            stack.frames.len(),
        ));

        let visible = visible_frames(&stack.frames);
        if visible.is_empty() {
            lines.push("    <no frames captured>".to_string());
        } else {
            // Outermost first, the way a traceback reads.
            for frame in visible.iter().rev() {
                lines.push(frame_line(frame));
                if let Some(src) = sources.line(frame) {
                    lines.push(format!("    {src}"));
                }
            }
        }
        lines.push(String::new());
    }
    lines.push(String::new());
    lines.push(String::new());
    lines.join("\n")
}

/// Frames to show for one thread: drop the fixed capture prefix, then any
/// remaining innermost frames that resolve into the capture machinery.
fn visible_frames(frames: &[CapturedFrame]) -> &[CapturedFrame] {
    let mut start = CAPTURE_FRAMES.min(frames.len());
    while start < frames.len() && is_capture_frame(frames[start].function.as_deref()) {
        start += 1;
    }
    &frames[start..]
}

fn is_capture_frame(function: Option<&str>) -> bool {
    function.is_some_and(|name| CAPTURE_SIGNATURES.iter().any(|sig| name.contains(sig)))
}

fn frame_line(frame: &CapturedFrame) -> String {
    let file = frame
        .file
        .as_deref()
        .map_or_else(|| "??".to_string(), |p| p.display().to_string());
    let line = frame.line.unwrap_or(0);
    let function = frame
        .function
        .as_deref()
        .map_or_else(|| format!("<unknown @ {:#x}>", frame.ip), str::to_string);
    format!("File: \"{file}\", line {line}, in {function}")
}

/// Reads and caches source files so each file is loaded once per report.
#[derive(Default)]
struct SourceCache {
    files: HashMap<PathBuf, Option<Vec<String>>>,
}

impl SourceCache {
    /// Trimmed source line for a frame, when the file is readable.
    fn line(&mut self, frame: &CapturedFrame) -> Option<String> {
        let path = frame.file.as_ref()?;
        let index = usize::try_from(frame.line?).ok()?.checked_sub(1)?;

        let lines = self.files.entry(path.clone()).or_insert_with(|| {
            fs::read_to_string(path)
                .ok()
                .map(|text| text.lines().map(str::to_string).collect())
        });

        let text = lines.as_ref()?.get(index)?.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}
