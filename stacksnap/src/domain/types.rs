//! Core identifier newtypes.

use std::fmt;

/// Operating-system process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub i32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

/// Kernel thread identifier, as listed under `/proc/<pid>/task`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tid(pub u32);

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID:{}", self.0)
    }
}

/// Pid of the current process.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn self_pid() -> Pid {
    Pid(std::process::id() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_display() {
        assert_eq!(Pid(1234).to_string(), "PID:1234");
    }

    #[test]
    fn test_tid_display() {
        assert_eq!(Tid(42).to_string(), "TID:42");
    }

    #[test]
    fn test_self_pid_matches_process_id() {
        #[allow(clippy::cast_possible_wrap)]
        let expected = std::process::id() as i32;
        assert_eq!(self_pid().0, expected);
    }
}
