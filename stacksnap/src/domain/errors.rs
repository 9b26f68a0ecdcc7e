//! Structured error types for stacksnap
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::{Pid, Tid};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to open controlling terminal {path}: {source}")]
    TtyOpen {
        path: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list threads of process {pid}")]
    ThreadList {
        pid: Pid,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to deliver capture signal to thread {0}")]
    CaptureSignal(Tid),

    #[error("Failed to register capture signal handler: {0}")]
    HandlerInstall(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_signal_error_display() {
        let err = SnapshotError::CaptureSignal(Tid(77));
        assert_eq!(err.to_string(), "Failed to deliver capture signal to thread TID:77");
    }

    #[test]
    fn test_tty_open_error_display() {
        let err = SnapshotError::TtyOpen {
            path: "/dev/tty",
            source: std::io::Error::from_raw_os_error(libc::ENXIO),
        };
        assert!(err.to_string().contains("/dev/tty"));
    }
}
