//! Timeout request.
//!
//! A request holds an expiry instant, the signal kind to deliver and the
//! context to deliver it to. It starts pending and ends either defused (the
//! caller finished first) or enforced (the scheduler got there first). The
//! request's own lock decides which.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::signal::{ContextHandle, SignalKind};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Shared handle returned to the caller that registered a deadline.
pub type RequestHandle = Arc<Request>;

/// Lifecycle of a request. Both non-pending states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Defused,
    Enforced,
}

#[derive(Debug)]
pub struct Request {
    /// Creation sequence; breaks ties between equal deadlines.
    id: u64,
    context: ContextHandle,
    deadline: Instant,
    kind: SignalKind,
    state: Mutex<RequestState>,
}

impl Request {
    pub fn new(context: ContextHandle, deadline: Instant, kind: SignalKind) -> Self {
        Self {
            id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            context,
            deadline,
            kind,
            state: Mutex::new(RequestState::Pending),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn context(&self) -> &ContextHandle {
        &self.context
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn state(&self) -> RequestState {
        *self.lock()
    }

    /// Stop this request from being enforced. No-op once enforced.
    pub fn defuse(&self) {
        let mut state = self.lock();
        if *state == RequestState::Pending {
            *state = RequestState::Defused;
        }
    }

    /// `true` once the request can no longer fire (defused or enforced).
    pub fn defused(&self) -> bool {
        *self.lock() != RequestState::Pending
    }

    pub fn enforced(&self) -> bool {
        *self.lock() == RequestState::Enforced
    }

    /// Deliver the signal unless already defused.
    ///
    /// Returns `true` iff this call delivered it. The state flips while the
    /// lock is still held, so a concurrent `defuse` or second `enforce`
    /// observes it.
    pub fn enforce(&self) -> bool {
        let mut state = self.lock();
        if *state != RequestState::Pending {
            return false;
        }
        self.context.deliver(self.kind);
        *state = RequestState::Enforced;
        true
    }

    fn lock(&self) -> MutexGuard<'_, RequestState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Request {}

impl PartialOrd for Request {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Request {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.deadline
            .cmp(&other.deadline)
            .then_with(|| self.id.cmp(&other.id))
    }
}
