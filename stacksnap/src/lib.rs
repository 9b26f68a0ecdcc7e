//! # stacksnap - on-demand and periodic thread-stack dumps
//!
//! stacksnap is a small diagnostic facility for hung or misbehaving
//! multi-threaded processes. Sending the process SIGUSR2 dumps every live
//! thread's call stack to the controlling terminal; an optional background
//! task logs the same snapshot every 5 seconds, together with a unified
//! diff against the previous snapshot showing what changed.
//!
//! ## Architecture Overview
//!
//! ```text
//! SIGUSR2 ──▶ listener thread ─┐
//!                              ├─▶ snapshot (capture + format + diff) ──▶ /dev/tty
//! 5s timer ──▶ periodic task ──┘                                     └──▶ log sink
//!
//! capture: for each tid in /proc/self/task, deliver SIGPROF; the
//! interrupted thread records its own frames and answers over a channel.
//! ```
//!
//! ## Module Structure
//!
//! - [`threads`]: enumerate live threads via `/proc/self/task`
//! - [`capture`]: per-thread frame capture over an internal signal
//! - [`snapshot`]: report formatting and last-snapshot history
//! - [`diff`]: line-based unified diff between consecutive snapshots
//! - [`trigger`]: SIGUSR2 listener writing dumps to the terminal
//! - [`periodic`]: cancellable background task logging dumps
//! - [`domain`]: core identifier newtypes and errors
//!
//! ## Typical Usage
//!
//! ```no_run
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Dump to the terminal on `kill -USR2 <pid>`.
//!     stacksnap::install_handler()?;
//!
//!     // Also log a snapshot + diff every 5 seconds.
//!     let periodic = stacksnap::dump_to_logger();
//!
//!     // ... run the application ...
//!
//!     periodic.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Key Concepts
//!
//! - **Snapshot**: formatted text capturing every live thread's call stack
//!   at one instant.
//! - **History**: the single most recently produced snapshot, kept behind
//!   a lock for diffing; record-and-diff is one atomic operation.
//! - **Capture signal**: SIGPROF, reserved by this crate to interrupt each
//!   thread so it can record its own frames.
//!
//! Snapshots are best-effort: a thread stuck in an uninterruptible syscall
//! is reported with a placeholder instead of stalling the dump, and the
//! capture path trades strict async-signal-safety for usefulness (see
//! [`capture`]).

pub mod capture;
pub mod diff;
pub mod domain;
pub mod periodic;
pub mod snapshot;
pub mod threads;
pub mod trigger;

// Re-export the public entry points
pub use periodic::{dump_to_logger, PeriodicDump, DUMP_INTERVAL, PERIODIC_LABEL};
pub use snapshot::{format_stacks, get_snapshot, Snapshotter, NO_CHANGE_MARKER};
pub use trigger::{install_handler, install_handler_to, DumpTarget, DUMP_SIGNAL};
