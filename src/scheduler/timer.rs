//! Single background timer thread.
//!
//! # Responsibilities
//! - Sleep until the armed instant, or forever when nothing is armed
//! - Wake early and re-plan when re-armed
//! - Invoke the expiry callback once per armed instant that is reached
//!
//! # Design Decisions
//! - Every `wake_at` bumps a generation counter; a wait only counts as
//!   expired if the generation is unchanged when it ends
//! - The arm is cleared before the callback runs, outside the timer lock

use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::config::TimerConfig;
use crate::observability::metrics;
use crate::scheduler::request::Request;
use crate::scheduler::request_scheduler::SchedulerObserver;
use crate::time::{measure, Clock};

type ExpiryCallback = Arc<dyn Fn() + Send + Sync>;

struct TimerState {
    armed: Option<Instant>,
    generation: u64,
    shutdown: bool,
    on_expiry: Option<ExpiryCallback>,
}

struct Shared {
    state: Mutex<TimerState>,
    cond: Condvar,
    clock: Arc<dyn Clock>,
}

enum Wake {
    Expired(Option<ExpiryCallback>),
    Shutdown,
}

pub struct Timer {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Timer {
    /// Spawn the timer thread.
    pub fn spawn(config: &TimerConfig, clock: Arc<dyn Clock>) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(TimerState {
                armed: None,
                generation: 0,
                shutdown: false,
                on_expiry: None,
            }),
            cond: Condvar::new(),
            clock,
        });

        let mut builder = thread::Builder::new().name(config.thread_name.clone());
        if let Some(kib) = config.stack_size_kib {
            builder = builder.stack_size(kib * 1024);
        }
        let worker = Arc::clone(&shared);
        let handle = builder.spawn(move || worker.run())?;

        Ok(Self {
            shared,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Arm (or re-arm) the timer for `at`; `None` disarms without firing.
    ///
    /// Instants in the past fire immediately.
    pub fn wake_at(&self, at: Option<Instant>) {
        let mut state = self.shared.lock();
        state.armed = at;
        state.generation = state.generation.wrapping_add(1);
        self.shared.cond.notify_one();
    }

    /// Set the function run when an armed instant is reached.
    pub fn on_expiry<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.lock().on_expiry = Some(Arc::new(callback));
    }

    /// The currently armed instant.
    pub fn armed(&self) -> Option<Instant> {
        self.shared.lock().armed
    }

    /// Stop the thread and wait for it to exit.
    ///
    /// Safe to call repeatedly, and from the timer thread itself (it then
    /// exits after the current callback without being joined).
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.lock();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
            self.shared.cond.notify_one();
        }

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
        tracing::debug!("Timer thread stopped");
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl SchedulerObserver for Timer {
    fn nearest_changed(&self, request: &Request) {
        self.wake_at(Some(request.deadline()));
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer").field("armed", &self.armed()).finish()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self) {
        tracing::debug!("Timer thread started");
        loop {
            match self.next_wake() {
                Wake::Expired(callback) => {
                    metrics::record_timer_fire();
                    if let Some(callback) = callback {
                        callback();
                    }
                }
                Wake::Shutdown => break,
            }
        }
    }

    /// Block until the armed instant passes without being superseded.
    fn next_wake(&self) -> Wake {
        let mut state = self.lock();
        loop {
            if state.shutdown {
                return Wake::Shutdown;
            }

            let Some(at) = state.armed else {
                state = self.cond.wait(state).unwrap_or_else(PoisonError::into_inner);
                continue;
            };

            let generation = state.generation;
            let time_left = at.saturating_duration_since(self.clock.now());
            if !time_left.is_zero() {
                tracing::trace!(wait_us = time_left.as_micros() as u64, "Timer sleeping");
                let (waited, slept) = measure(self.clock.as_ref(), || {
                    self.cond.wait_timeout(state, time_left)
                });
                state = match waited {
                    Ok((guard, _)) => guard,
                    Err(poisoned) => poisoned.into_inner().0,
                };

                // Re-armed, disarmed or shut down meanwhile.
                if state.generation != generation || state.shutdown {
                    continue;
                }
                // Spurious wakeup: same arm, wait out the rest.
                if slept < time_left {
                    continue;
                }
            }

            state.armed = None;
            return Wake::Expired(state.on_expiry.clone());
        }
    }
}
