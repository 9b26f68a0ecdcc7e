//! Demo process for exercising stack dumps by hand.
//!
//! Spawns a few named worker threads (one of them deliberately stuck),
//! installs the SIGUSR2 handler and the periodic logger, then idles.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run --example hang-demo
//!
//! # In another terminal: dump all thread stacks to this terminal
//! kill -USR2 $(pgrep hang-demo)
//! ```
//!
//! Watch the periodic log output: the diff section shows the busy workers
//! moving while the stuck thread never changes.

use std::thread;
use std::time::Duration;

fn busy_worker(id: usize) {
    loop {
        // Alternate between two call depths so consecutive dumps differ.
        if id % 2 == 0 {
            nap();
        } else {
            thread::sleep(Duration::from_millis(250));
        }
    }
}

fn nap() {
    thread::sleep(Duration::from_millis(750));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    for id in 0..3 {
        thread::Builder::new()
            .name(format!("worker-{id}"))
            .spawn(move || busy_worker(id))?;
    }

    // A thread that blocks forever, the thing this crate exists to find.
    thread::Builder::new().name("stuck".into()).spawn(|| {
        let (_tx, rx) = std::sync::mpsc::channel::<()>();
        let _ = rx.recv();
    })?;

    stacksnap::install_handler()?;
    let _periodic = stacksnap::dump_to_logger();

    let pid = std::process::id();
    println!("hang-demo running; dump thread stacks with: kill -USR2 {pid}");

    loop {
        tokio::time::sleep(Duration::from_secs(60)).await;
    }
}
