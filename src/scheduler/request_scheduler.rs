//! Request scheduler.
//!
//! Owns the ordered request store and the per-context index behind a single
//! lock. Reports the nearest deadline to a [`SchedulerObserver`] (normally
//! the [`Timer`](crate::scheduler::Timer)) and enforces expired requests when
//! the timer fires.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::observability::metrics;
use crate::queue::{OrderedStore, StoreObserver, ThreadIndex};
use crate::scheduler::request::{Request, RequestHandle};
use crate::signal::{ContextHandle, ContextId, SignalKind};
use crate::time::Clock;

/// Longest delay honoured; anything above is clamped.
const MAX_DELAY: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Hooks fired by the scheduler while its lock is held.
///
/// Implementations must not call back into the scheduler.
pub trait SchedulerObserver: Send + Sync {
    /// A different request is now the nearest pending one.
    fn nearest_changed(&self, request: &Request);

    /// An expiry pass is about to enforce requests.
    fn before_enforce(&self) {}
}

impl SchedulerObserver for () {
    fn nearest_changed(&self, _request: &Request) {}
}

type RequestIndex = ThreadIndex<ContextId, RequestHandle>;

impl StoreObserver<RequestHandle> for RequestIndex {
    fn added(&mut self, request: &RequestHandle) {
        self.record(request.context().id(), Arc::clone(request));
    }

    fn removed(&mut self, request: &RequestHandle) {
        self.forget(&request.context().id(), request);
    }
}

pub struct RequestScheduler {
    clock: Arc<dyn Clock>,
    observer: Arc<dyn SchedulerObserver>,
    requests: Mutex<OrderedStore<RequestHandle, RequestIndex>>,
}

impl RequestScheduler {
    pub fn new(clock: Arc<dyn Clock>, observer: Arc<dyn SchedulerObserver>) -> Self {
        Self {
            clock,
            observer,
            requests: Mutex::new(OrderedStore::with_observer(RequestIndex::new())),
        }
    }

    /// Register a deadline `delay` from now for the calling thread.
    pub fn enqueue(&self, delay: Duration, kind: SignalKind) -> RequestHandle {
        self.enqueue_for(ContextHandle::current(), delay, kind)
    }

    /// Register a deadline `delay` from now for `context`.
    pub fn enqueue_for(&self, context: ContextHandle, delay: Duration, kind: SignalKind) -> RequestHandle {
        let now = self.clock.now();
        let deadline = now
            .checked_add(delay.min(MAX_DELAY))
            .unwrap_or_else(|| now + Duration::from_secs(24 * 60 * 60));
        self.enqueue_at(context, deadline, kind)
    }

    /// Register an absolute deadline for `context`.
    pub fn enqueue_at(&self, context: ContextHandle, deadline: Instant, kind: SignalKind) -> RequestHandle {
        let request = Arc::new(Request::new(context, deadline, kind));

        let mut requests = self.lock();
        if requests.insert(Arc::clone(&request)) {
            tracing::debug!(
                request = request.id(),
                context = request.context().id().as_u64(),
                "New nearest deadline"
            );
            self.observer.nearest_changed(&request);
        }
        metrics::record_enqueued(requests.len());

        request
    }

    /// Enforce every request whose deadline has passed, then report the new
    /// nearest request.
    ///
    /// A context receives at most one signal per pass: once one of its
    /// requests is enforced, all its other pending requests are defused.
    pub fn process_expired(&self) {
        let mut requests = self.lock();
        self.observer.before_enforce();

        let now = self.clock.now();
        let expired = requests.remove_while(|r| r.deadline() <= now);

        let mut signalled: HashSet<ContextId> = HashSet::new();
        for request in &expired {
            let context = request.context().id();
            if signalled.contains(&context) {
                request.defuse();
                continue;
            }
            if !request.enforce() {
                continue;
            }

            signalled.insert(context);
            let lateness = now.saturating_duration_since(request.deadline());
            metrics::record_enforced(request.kind(), lateness);
            tracing::debug!(
                request = request.id(),
                context = context.as_u64(),
                kind = %request.kind(),
                lateness_us = lateness.as_micros() as u64,
                "Deadline enforced"
            );

            if let Some(siblings) = requests.observer().lookup(&context) {
                siblings.iter().for_each(|r| r.defuse());
            }
        }

        let discarded = requests.remove_while(|r| r.defused());
        metrics::record_discarded(expired.len() - signalled.len() + discarded.len());

        if let Some(nearest) = requests.peek_nearest() {
            self.observer.nearest_changed(nearest);
        }
        metrics::record_pending(requests.len());
    }

    /// Number of requests still held (pending, or defused but not yet dropped).
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Deadline of the nearest held request.
    pub fn nearest_deadline(&self) -> Option<Instant> {
        self.lock().peek_nearest().map(|r| r.deadline())
    }

    /// Number of contexts with at least one held request.
    pub fn contexts(&self) -> usize {
        self.lock().observer().len()
    }

    fn lock(&self) -> MutexGuard<'_, OrderedStore<RequestHandle, RequestIndex>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RequestScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestScheduler")
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}
