//! Shared utilities for integration tests.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use frugal_deadline::{sleep, DeadlineExceeded, Engine, EngineConfig};

/// Start a private engine with default settings.
pub fn start_engine() -> Engine {
    Engine::start(&EngineConfig::default()).expect("engine should start")
}

/// Poll `cond` until it holds or `limit` passes.
#[allow(dead_code)]
pub fn wait_until(limit: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < limit {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Outcome of one guarded call that blocks until its deadline.
#[derive(Debug)]
#[allow(dead_code)]
pub struct Finished {
    pub delay: Duration,
    pub elapsed: Duration,
    pub expired: bool,
}

/// Spawn a thread that runs a guarded infinite sleep and reports on `tx`.
#[allow(dead_code)]
pub fn spawn_blocked_call(
    engine: &'static Engine,
    delay: Duration,
    tx: mpsc::Sender<Finished>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let start = Instant::now();
        let res: Result<(), DeadlineExceeded> =
            engine.timeout(delay, |_| sleep(Duration::from_secs(3600)));
        let _ = tx.send(Finished {
            delay,
            elapsed: start.elapsed(),
            expired: res.is_err(),
        });
    })
}

/// Leak an engine so spawned threads can borrow it for `'static`.
#[allow(dead_code)]
pub fn leaked_engine() -> &'static Engine {
    Box::leak(Box::new(start_engine()))
}
