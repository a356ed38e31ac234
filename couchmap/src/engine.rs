//! Aggregation decision engine.
//!
//! Every viewport change runs one cycle:
//!
//! ```text
//! viewport change ──► Probe (count in bbox)
//!                       │
//!          count >= threshold ──► Resolve (grouped count per tile) ──► coarse markers
//!                       │
//!          count <  threshold ──► Exact (raw rows) ──► points
//! ```
//!
//! Requests run as tokio tasks and report back through a [`Completion`]
//! channel. The owner of the engine feeds completions into
//! [`AggregationEngine::handle_completion`]. A new viewport change cancels
//! everything still in flight, and a completion whose request is no longer
//! tracked is dropped, so only the newest cycle can reach the display.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::config::{ConfigError, EngineConfig};
use crate::coord::tiles_in_bbox;
use crate::layers::ActivationHooks;
use crate::map::{CoarseMarker, MapWidget, MarkerSink};
use crate::request::{PendingRequest, RequestId, RequestKind, RequestTracker};
use crate::service::{CoarseCountRow, DataService, PointRow, ServiceError};

/// Result of one data-service request, posted back to the engine.
#[derive(Debug)]
pub struct Completion {
    id: RequestId,
    outcome: Outcome,
}

impl Completion {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> RequestKind {
        match self.outcome {
            Outcome::Probe(_) => RequestKind::Probe,
            Outcome::Resolve(_) => RequestKind::Resolve,
            Outcome::Exact(_) => RequestKind::Exact,
        }
    }

    pub fn is_ok(&self) -> bool {
        match &self.outcome {
            Outcome::Probe(result) => result.is_ok(),
            Outcome::Resolve(result) => result.is_ok(),
            Outcome::Exact(result) => result.is_ok(),
        }
    }
}

#[derive(Debug)]
enum Outcome {
    Probe(Result<u64, ServiceError>),
    Resolve(Result<Vec<CoarseCountRow>, ServiceError>),
    Exact(Result<Vec<PointRow>, ServiceError>),
}

/// Where the current cycle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Probing,
    Resolving,
    FetchingExact,
}

/// Decides between aggregated and exact rendering for each viewport.
pub struct AggregationEngine<M, S> {
    config: EngineConfig,
    service: Arc<dyn DataService>,
    map: M,
    sink: S,
    requests: RequestTracker,
    completions: mpsc::UnboundedSender<Completion>,
    active: bool,
}

impl<M: MapWidget, S: MarkerSink> AggregationEngine<M, S> {
    /// Creates an inactive engine. Completions of its requests are sent on `completions`.
    pub fn new(
        config: EngineConfig,
        service: Arc<dyn DataService>,
        map: M,
        sink: S,
        completions: mpsc::UnboundedSender<Completion>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            service,
            map,
            sink,
            requests: RequestTracker::new(),
            completions,
            active: false,
        })
    }

    /// Start a new cycle for the map's current viewport.
    ///
    /// Ignored while inactive. Must be called from within a tokio runtime.
    pub fn on_viewport_change(&mut self) {
        if !self.active {
            trace!("Viewport change while inactive, ignoring");
            return;
        }

        self.requests.cancel_all();

        let viewport = self.map.viewport();
        let bbox = viewport.bbox;
        let service = Arc::clone(&self.service);
        let id = self.issue(
            RequestKind::Probe,
            async move { service.probe_count(bbox).await },
            Outcome::Probe,
        );
        debug!(request = %id, bbox = %bbox, zoom = viewport.zoom, "Issued probe");
    }

    /// Apply a completion. Completions of untracked requests are no-ops.
    pub fn handle_completion(&mut self, completion: Completion) {
        let Completion { id, outcome } = completion;
        match outcome {
            Outcome::Probe(result) => {
                if let Some(count) = self.accept(id, result) {
                    self.decide(count);
                }
            }
            Outcome::Resolve(result) => {
                if let Some(rows) = self.accept(id, result) {
                    self.render_coarse(rows);
                }
            }
            Outcome::Exact(result) => {
                if let Some(rows) = self.accept(id, result) {
                    self.render_points(rows);
                }
            }
        }
    }

    /// Cancel everything in flight.
    pub fn shutdown(&mut self) {
        let cancelled = self.requests.cancel_all();
        debug!(cancelled, "Engine shut down");
    }

    pub fn phase(&self) -> Phase {
        let kinds: Vec<RequestKind> = self.requests.iter().map(PendingRequest::kind).collect();
        if kinds.contains(&RequestKind::Probe) {
            Phase::Probing
        } else if kinds.contains(&RequestKind::Resolve) {
            Phase::Resolving
        } else if kinds.contains(&RequestKind::Exact) {
            Phase::FetchingExact
        } else {
            Phase::Idle
        }
    }

    pub fn is_busy(&self) -> bool {
        !self.requests.is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn requests(&self) -> &RequestTracker {
        &self.requests
    }

    /// Pick the follow-up request for the map's viewport as it is now, which
    /// can differ from the counted one after the layers were switched off.
    fn decide(&mut self, count: u64) {
        let viewport = self.map.viewport();
        let service = Arc::clone(&self.service);

        if self.config.aggregates(count) {
            let tile_zoom = self.config.tile_zoom(viewport.zoom, viewport.max_zoom);
            let tiles = tiles_in_bbox(&viewport.bbox, tile_zoom);
            let tile_count = tiles.len();
            let id = self.issue(
                RequestKind::Resolve,
                async move { service.grouped_count(tiles).await },
                Outcome::Resolve,
            );
            debug!(
                request = %id,
                count,
                threshold = self.config.coarse_threshold,
                tile_zoom,
                tiles = tile_count,
                "Aggregating, issued grouped count"
            );
        } else {
            let bbox = viewport.bbox;
            let id = self.issue(
                RequestKind::Exact,
                async move { service.fetch_points(bbox).await },
                Outcome::Exact,
            );
            debug!(
                request = %id,
                count,
                threshold = self.config.coarse_threshold,
                "Below threshold, issued exact fetch"
            );
        }
    }

    fn render_coarse(&mut self, rows: Vec<CoarseCountRow>) {
        let markers: Vec<CoarseMarker> = rows.iter().map(CoarseMarker::from_row).collect();
        debug!(markers = markers.len(), "Rendering coarse markers");

        self.sink.clear_points();
        self.sink.clear_coarse();
        for marker in markers {
            self.sink.add_coarse(marker);
        }
    }

    fn render_points(&mut self, rows: Vec<PointRow>) {
        debug!(points = rows.len(), "Rendering exact points");
        self.sink.clear_coarse();
        self.sink.show_points(rows);
    }

    /// Untrack a finished request, returning its value if it is still current.
    fn accept<T>(&mut self, id: RequestId, result: Result<T, ServiceError>) -> Option<T> {
        match result {
            Ok(value) if self.requests.untrack(id) => Some(value),
            Ok(_) => {
                trace!(request = %id, "Dropping stale completion");
                None
            }
            Err(error) => {
                self.requests.fail(id, &error);
                None
            }
        }
    }

    /// Spawn `work`, racing it against a fresh cancellation token, and track it.
    fn issue<T, F, W>(&mut self, kind: RequestKind, work: F, wrap: W) -> RequestId
    where
        T: Send + 'static,
        F: Future<Output = Result<T, ServiceError>> + Send + 'static,
        W: FnOnce(Result<T, ServiceError>) -> Outcome + Send + 'static,
    {
        let id = self.requests.next_id();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let completions = self.completions.clone();

        let task = tokio::spawn(async move {
            let result = tokio::select! {
                biased;

                _ = cancelled.cancelled() => Err(ServiceError::Cancelled),
                result = work => result,
            };
            // The receiver is gone once the engine's owner has stopped.
            let _ = completions.send(Completion {
                id,
                outcome: wrap(result),
            });
        });

        self.requests
            .track(PendingRequest::new(id, kind, token).with_task(task))
    }
}

impl<M: MapWidget, S: MarkerSink> ActivationHooks for AggregationEngine<M, S> {
    fn activate(&mut self) {
        self.map.subscribe();
        self.active = true;
        info!("Data layers enabled, engine active");
        self.on_viewport_change();
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.map.unsubscribe();
        info!(in_flight = self.requests.len(), "Data layers disabled, engine inactive");
    }
}

impl<M, S> Drop for AggregationEngine<M, S> {
    fn drop(&mut self) {
        self.requests.cancel_all();
    }
}
