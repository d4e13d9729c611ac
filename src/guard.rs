//! Deadline-guarded calls.
//!
//! ```no_run
//! use std::time::Duration;
//! use frugal_deadline::{sleep, timeout, Error};
//!
//! let res: Result<(), Error> = timeout(Duration::from_millis(100), |_| {
//!     sleep(Duration::from_secs(60))?;
//!     Ok(())
//! });
//! assert!(res.is_err());
//! ```

use std::future::Future;
use std::time::Duration;

use crate::error::{DeadlineExceeded, EngineError, Error};
use crate::lifecycle::Engine;
use crate::scheduler::RequestHandle;
use crate::signal::{ContextHandle, SignalKind};

/// Defuses the request when the guarded call ends, including by panic.
struct Defuser {
    request: Option<RequestHandle>,
    context: ContextHandle,
}

impl Defuser {
    fn new(request: RequestHandle, context: ContextHandle) -> Self {
        Self {
            request: Some(request),
            context,
        }
    }

    /// Defuse, and take the signal if the request fired and nobody consumed it.
    fn disarm(&mut self) -> Option<SignalKind> {
        let request = self.request.take()?;
        request.defuse();
        if request.enforced() {
            self.context.take_signal()
        } else {
            None
        }
    }
}

impl Drop for Defuser {
    fn drop(&mut self) {
        self.disarm();
    }
}

impl Engine {
    /// Run `f` with a deadline of `delay` on the calling thread. `f` receives `delay`.
    pub fn timeout<T, E, F>(&self, delay: Duration, f: F) -> Result<T, E>
    where
        F: FnOnce(Duration) -> Result<T, E>,
        E: From<DeadlineExceeded>,
    {
        self.timeout_with(delay, SignalKind::Timeout, f)
    }

    /// Run `f` with a deadline of `delay`, signalling `kind` on expiry.
    ///
    /// `f` observes the signal through [`checkpoint`](crate::checkpoint) or
    /// [`sleep`](crate::sleep). If the deadline fired but `f` returned without
    /// observing it, the call still fails with `DeadlineExceeded`.
    pub fn timeout_with<T, E, F>(&self, delay: Duration, kind: SignalKind, f: F) -> Result<T, E>
    where
        F: FnOnce(Duration) -> Result<T, E>,
        E: From<DeadlineExceeded>,
    {
        let context = ContextHandle::current();
        let request = self.scheduler().enqueue_for(context.clone(), delay, kind);
        let mut defuser = Defuser::new(request, context);

        let result = f(delay);
        match defuser.disarm() {
            Some(kind) => Err(DeadlineExceeded { kind }.into()),
            None => result,
        }
    }

    /// Race `future` against a deadline of `delay`.
    ///
    /// The future runs under its own detached context, so it may move between
    /// threads.
    pub async fn timeout_future<F>(
        &self,
        delay: Duration,
        kind: SignalKind,
        future: F,
    ) -> Result<F::Output, DeadlineExceeded>
    where
        F: Future,
    {
        let context = ContextHandle::detached();
        let request = self.scheduler().enqueue_for(context.clone(), delay, kind);
        let mut defuser = Defuser::new(request, context.clone());

        tokio::select! {
            output = future => match defuser.disarm() {
                Some(kind) => Err(DeadlineExceeded { kind }),
                None => Ok(output),
            },
            kind = context.cancelled() => {
                defuser.disarm();
                Err(DeadlineExceeded { kind })
            }
        }
    }
}

/// Run `f` under a deadline on the global engine.
pub fn timeout<T, E, F>(delay: Duration, f: F) -> Result<T, E>
where
    F: FnOnce(Duration) -> Result<T, E>,
    E: From<DeadlineExceeded> + From<EngineError>,
{
    timeout_with(delay, SignalKind::Timeout, f)
}

/// Run `f` under a deadline on the global engine, signalling `kind`.
pub fn timeout_with<T, E, F>(delay: Duration, kind: SignalKind, f: F) -> Result<T, E>
where
    F: FnOnce(Duration) -> Result<T, E>,
    E: From<DeadlineExceeded> + From<EngineError>,
{
    Engine::global()?.timeout_with(delay, kind, f)
}

/// Race `future` against a deadline on the global engine.
pub async fn timeout_future<F>(delay: Duration, future: F) -> Result<F::Output, Error>
where
    F: Future,
{
    let engine = Engine::global()?;
    Ok(engine.timeout_future(delay, SignalKind::Timeout, future).await?)
}
