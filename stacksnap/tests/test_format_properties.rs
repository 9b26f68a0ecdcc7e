//! Whole-report properties that need a deterministic thread set.
//!
//! Single test function in its own binary on purpose: the only threads
//! alive are the harness main thread (parked), this test thread, and the
//! one worker it spawns, so thread counts and byte-for-byte comparisons
//! cannot race with sibling tests.

use std::sync::mpsc;
use std::thread;

use stacksnap::snapshot::format_stacks;
use stacksnap::threads::list_live_threads;

/// Tid printed in a header line: `# PID <pid> ThreadID: (<name>) <tid>; ...`
fn header_tid(header: &str) -> Option<u32> {
    let before_semi = header.split(';').next()?;
    before_semi.rsplit(' ').next()?.parse().ok()
}

#[test]
fn report_covers_each_live_thread_exactly_once_and_is_stable() {
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (ready_tx, ready_rx) = mpsc::channel::<()>();
    let worker = thread::Builder::new()
        .name("steady".into())
        .spawn(move || {
            ready_tx.send(()).unwrap();
            release_rx.recv().unwrap();
        })
        .unwrap();
    ready_rx.recv().unwrap();

    let threads = list_live_threads().expect("list_live_threads");
    let report = format_stacks().expect("format_stacks");

    let headers: Vec<&str> = report.lines().filter(|l| l.starts_with("# PID ")).collect();
    assert_eq!(headers.len(), threads.len(), "one header per live thread:\n{report}");

    let mut tids: Vec<u32> = headers.iter().filter_map(|h| header_tid(h)).collect();
    assert_eq!(tids.len(), headers.len(), "every header carries a parseable tid");
    tids.sort_unstable();
    tids.dedup();
    assert_eq!(tids.len(), headers.len(), "no thread reported twice");
    for t in &threads {
        assert!(tids.binary_search(&t.tid.0).is_ok(), "thread {} missing from report", t.tid);
    }

    // Unchanged thread set => byte-identical reports. Both calls come from
    // the same call site so every frame above the snapshotter matches.
    let reports: Vec<String> = (0..2).map(|_| format_stacks().expect("format_stacks")).collect();
    assert_eq!(reports[0], reports[1]);

    release_tx.send(()).unwrap();
    worker.join().unwrap();
}
