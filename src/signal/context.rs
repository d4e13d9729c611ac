//! Execution contexts that can receive a cancellation signal.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use tokio::sync::Notify;

use crate::error::DeadlineExceeded;
use crate::signal::SignalKind;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: ContextHandle = ContextHandle::for_thread(thread::current());
}

/// Identity of an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct ContextSlot {
    id: ContextId,
    /// Parked in `sleep`; unparked on delivery.
    thread: Option<Thread>,
    pending: Mutex<Option<SignalKind>>,
    delivered: AtomicUsize,
    notify: Notify,
}

/// Shared handle to an execution context.
///
/// Every thread owns one implicit context ([`ContextHandle::current`]).
/// Futures run under a [`ContextHandle::detached`] context because they may
/// migrate between threads.
#[derive(Debug, Clone)]
pub struct ContextHandle {
    slot: Arc<ContextSlot>,
}

impl ContextHandle {
    fn for_thread(thread: Thread) -> Self {
        Self::build(Some(thread))
    }

    fn build(thread: Option<Thread>) -> Self {
        Self {
            slot: Arc::new(ContextSlot {
                id: ContextId::next(),
                thread,
                pending: Mutex::new(None),
                delivered: AtomicUsize::new(0),
                notify: Notify::new(),
            }),
        }
    }

    /// The calling thread's context.
    pub fn current() -> Self {
        CURRENT
            .try_with(Clone::clone)
            .unwrap_or_else(|_| Self::for_thread(thread::current()))
    }

    /// A fresh context that is not bound to any thread.
    pub fn detached() -> Self {
        Self::build(None)
    }

    pub fn id(&self) -> ContextId {
        self.slot.id
    }

    /// Total number of signals ever delivered to this context.
    pub fn signals_delivered(&self) -> usize {
        self.slot.delivered.load(Ordering::Acquire)
    }

    /// Signal waiting to be observed, if any.
    pub fn pending_signal(&self) -> Option<SignalKind> {
        *self.pending()
    }

    /// Consume the pending signal.
    pub fn take_signal(&self) -> Option<SignalKind> {
        self.pending().take()
    }

    /// Return `Err` if a signal is pending, consuming it.
    pub fn checkpoint(&self) -> Result<(), DeadlineExceeded> {
        match self.take_signal() {
            Some(kind) => Err(DeadlineExceeded { kind }),
            None => Ok(()),
        }
    }

    /// Wait until a signal is delivered, then consume it.
    pub async fn cancelled(&self) -> SignalKind {
        loop {
            let notified = self.slot.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a delivery in between is not lost.
            notified.as_mut().enable();

            if let Some(kind) = self.take_signal() {
                return kind;
            }
            notified.await;
        }
    }

    /// Deliver `kind` to this context. Never blocks on the target.
    pub(crate) fn deliver(&self, kind: SignalKind) {
        {
            let mut pending = self.pending();
            if let Some(previous) = pending.replace(kind) {
                tracing::warn!(
                    context = self.slot.id.as_u64(),
                    previous = %previous,
                    "Signal delivered while an earlier one was still unobserved"
                );
            }
            self.slot.delivered.fetch_add(1, Ordering::AcqRel);
        }

        if let Some(thread) = &self.slot.thread {
            thread.unpark();
        }
        self.slot.notify.notify_waiters();
    }

    /// Interruptible sleep on the calling thread.
    ///
    /// Only wakes early for signals delivered to this context, and only when
    /// this context belongs to the calling thread.
    pub fn sleep(&self, duration: Duration) -> Result<(), DeadlineExceeded> {
        // Past the end of `Instant`, sleep until signalled.
        let Some(until) = Instant::now().checked_add(duration) else {
            loop {
                self.checkpoint()?;
                thread::park();
            }
        };
        loop {
            self.checkpoint()?;
            let now = Instant::now();
            if now >= until {
                return Ok(());
            }
            thread::park_timeout(until - now);
        }
    }

    fn pending(&self) -> MutexGuard<'_, Option<SignalKind>> {
        self.slot.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for ContextHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl Eq for ContextHandle {}

/// Check the calling thread's context for a pending signal.
pub fn checkpoint() -> Result<(), DeadlineExceeded> {
    ContextHandle::current().checkpoint()
}

/// Sleep on the calling thread, waking early if its context is signalled.
pub fn sleep(duration: Duration) -> Result<(), DeadlineExceeded> {
    ContextHandle::current().sleep(duration)
}
