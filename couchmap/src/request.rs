//! Request lifecycle tracking.
//!
//! [`RequestTracker`] owns every in-flight data-service request from issuance
//! until it completes, fails, or is cancelled. The aggregation engine cancels
//! everything on each viewport change, so at most one probe and one bulk
//! fetch are ever outstanding.
//!
//! Cancellation is cooperative: [`PendingRequest::abort`] fires the request's
//! [`CancellationToken`] and aborts its task, but a completion that was
//! already queued may still be delivered. Completion handlers therefore call
//! [`RequestTracker::untrack`] first and drop the result when it returns
//! `false`.

use std::fmt;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::service::ServiceError;

/// Identifier assigned to a tracked request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a request asks the data service for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Count of points inside the viewport.
    Probe,
    /// Grouped per-tile counts.
    Resolve,
    /// Raw point rows for the exact rendering path.
    Exact,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Probe => "probe",
            RequestKind::Resolve => "resolve",
            RequestKind::Exact => "exact",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to one in-flight request.
#[derive(Debug)]
pub struct PendingRequest {
    id: RequestId,
    kind: RequestKind,
    cancellation: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PendingRequest {
    /// Create a handle for a request whose work is driven elsewhere.
    pub fn new(id: RequestId, kind: RequestKind, cancellation: CancellationToken) -> Self {
        Self {
            id,
            kind,
            cancellation,
            task: None,
        }
    }

    /// Attach the task running the request so `abort` can stop it.
    pub fn with_task(mut self, task: JoinHandle<()>) -> Self {
        self.task = Some(task);
        self
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Signal cancellation to the request.
    ///
    /// Idempotent. The request's completion may still be delivered afterwards.
    pub fn abort(&self) {
        self.cancellation.cancel();
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

/// Ordered collection of in-flight requests.
#[derive(Debug, Default)]
pub struct RequestTracker {
    next_id: u64,
    pending: Vec<PendingRequest>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the identifier for the next request.
    ///
    /// Identifiers are never reused, so a late completion can never be
    /// mistaken for a newer request.
    pub fn next_id(&mut self) -> RequestId {
        self.next_id += 1;
        RequestId(self.next_id)
    }

    /// Start tracking a request.
    pub fn track(&mut self, request: PendingRequest) -> RequestId {
        let id = request.id;
        trace!(request = %id, kind = %request.kind, "Tracking request");
        self.pending.push(request);
        id
    }

    /// Stop tracking a request that finished normally.
    ///
    /// Returns `false` if the request was not tracked (already cancelled or
    /// already untracked); that is not an error.
    pub fn untrack(&mut self, id: RequestId) -> bool {
        match self.pending.iter().position(|r| r.id == id) {
            Some(index) => {
                self.pending.remove(index);
                true
            }
            None => false,
        }
    }

    /// Stop tracking a request that reported failure.
    ///
    /// Transport failures are logged; cancellations are expected and stay
    /// quiet. Nothing is retried.
    pub fn fail(&mut self, id: RequestId, error: &ServiceError) -> bool {
        let removed = self.untrack(id);
        if error.is_cancelled() {
            trace!(request = %id, "Request cancelled");
        } else if removed {
            warn!(request = %id, error = %error, "Request failed, removing from queue");
        } else {
            debug!(request = %id, error = %error, "Stale request failed");
        }
        removed
    }

    /// Abort every tracked request and forget them all.
    ///
    /// Returns how many requests were aborted. Safe to call when empty.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        for request in self.pending.drain(..) {
            request.abort();
        }
        if count > 0 {
            debug!(count, "Cancelled in-flight requests");
        }
        count
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.pending.iter().any(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Tracked requests in issuance order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingRequest> {
        self.pending.iter()
    }
}
