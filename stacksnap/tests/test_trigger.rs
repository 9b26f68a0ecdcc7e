//! Signal-triggered dump test.
//!
//! Runs in its own test binary: it installs a process-global logger and
//! raises SIGUSR2 against itself, which would interfere with any other
//! test sharing the process. One test function covers the whole sequence
//! for the same reason.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::{LevelFilter, Metadata, Record};

use stacksnap::trigger::{install_handler_to, DumpTarget, DUMP_SIGNAL, ON_DEMAND_LABEL};

static RECORDS: Mutex<Vec<String>> = Mutex::new(Vec::new());

struct CountingLogger;

impl log::Log for CountingLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS.lock().unwrap().push(record.args().to_string());
    }

    fn flush(&self) {}
}

static LOGGER: CountingLogger = CountingLogger;

fn dumps_seen() -> usize {
    RECORDS.lock().unwrap().iter().filter(|r| r.starts_with(ON_DEMAND_LABEL)).count()
}

/// Poll until `want` dumps arrived or the deadline passes.
fn wait_for_dumps(want: usize) -> usize {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        let seen = dumps_seen();
        if seen >= want {
            return seen;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    dumps_seen()
}

#[test]
fn one_dump_per_signal_delivery() {
    log::set_logger(&LOGGER).expect("logger already set");
    log::set_max_level(LevelFilter::Info);

    install_handler_to(DumpTarget::Log).expect("install handler");

    signal_hook::low_level::raise(DUMP_SIGNAL).expect("raise");
    assert_eq!(wait_for_dumps(1), 1, "expected exactly one dump after one signal");

    signal_hook::low_level::raise(DUMP_SIGNAL).expect("raise");
    assert_eq!(wait_for_dumps(2), 2, "expected exactly one more dump");

    // Re-installing replaces the previous listener rather than stacking a
    // second one: the next signal still produces a single dump.
    install_handler_to(DumpTarget::Log).expect("re-install handler");
    signal_hook::low_level::raise(DUMP_SIGNAL).expect("raise");
    assert_eq!(wait_for_dumps(3), 3, "re-install must not double dumps");

    // The records carry a full snapshot.
    let records = RECORDS.lock().unwrap();
    let dump = records.iter().find(|r| r.starts_with(ON_DEMAND_LABEL)).unwrap();
    assert!(dump.contains("# PID "), "dump should embed the snapshot text");
}
