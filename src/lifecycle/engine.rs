//! Engine: one scheduler driven by one timer thread.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use crate::config::{validate_config, ConfigError, EngineConfig};
use crate::error::EngineError;
use crate::scheduler::{RequestHandle, RequestScheduler, SchedulerObserver, Timer};
use crate::signal::SignalKind;
use crate::time::{Clock, MonotonicClock};

static GLOBAL: OnceLock<Engine> = OnceLock::new();
static GLOBAL_INIT: Mutex<()> = Mutex::new(());

/// A request scheduler wired to its own timer thread.
#[derive(Debug)]
pub struct Engine {
    scheduler: Arc<RequestScheduler>,
    timer: Arc<Timer>,
}

impl Engine {
    /// Start an engine on the monotonic clock.
    pub fn start(config: &EngineConfig) -> Result<Self, EngineError> {
        Self::with_clock(config, Arc::new(MonotonicClock))
    }

    /// Start an engine on a custom clock.
    pub fn with_clock(config: &EngineConfig, clock: Arc<dyn Clock>) -> Result<Self, EngineError> {
        validate_config(config).map_err(|errors| EngineError::Config(ConfigError::Validation(errors)))?;

        let timer = Arc::new(Timer::spawn(&config.timer, Arc::clone(&clock)).map_err(EngineError::Spawn)?);
        let observer: Arc<dyn SchedulerObserver> = timer.clone();
        let scheduler = Arc::new(RequestScheduler::new(clock, observer));

        let weak = Arc::downgrade(&scheduler);
        timer.on_expiry(move || {
            if let Some(scheduler) = weak.upgrade() {
                scheduler.process_expired();
            }
        });

        tracing::info!(thread = %config.timer.thread_name, "Deadline engine started");
        Ok(Self { scheduler, timer })
    }

    /// The process-wide engine, started with defaults on first use.
    pub fn global() -> Result<&'static Engine, EngineError> {
        if let Some(engine) = GLOBAL.get() {
            return Ok(engine);
        }

        let _guard = GLOBAL_INIT.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(engine) = GLOBAL.get() {
            return Ok(engine);
        }
        let engine = Engine::start(&EngineConfig::default())?;
        Ok(GLOBAL.get_or_init(|| engine))
    }

    /// Install the process-wide engine with `config`.
    ///
    /// Fails with [`EngineError::AlreadyInstalled`] if a global engine exists,
    /// including one created implicitly by [`Engine::global`].
    pub fn install(config: &EngineConfig) -> Result<&'static Engine, EngineError> {
        let _guard = GLOBAL_INIT.lock().unwrap_or_else(PoisonError::into_inner);
        if GLOBAL.get().is_some() {
            return Err(EngineError::AlreadyInstalled);
        }
        let engine = Engine::start(config)?;
        Ok(GLOBAL.get_or_init(|| engine))
    }

    pub fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Register a deadline for the calling thread.
    pub fn enqueue(&self, delay: Duration, kind: SignalKind) -> RequestHandle {
        self.scheduler.enqueue(delay, kind)
    }

    /// Requests still held by the scheduler.
    pub fn pending(&self) -> usize {
        self.scheduler.size()
    }

    /// Stop the timer thread. Pending requests will never be enforced.
    pub fn shutdown(&self) {
        self.timer.shutdown();
        tracing::info!(pending = self.scheduler.size(), "Deadline engine stopped");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.timer.shutdown();
    }
}
