//! The map overlay controller.
//!
//! [`CouchMap`] ties the pieces together: layer toggles drive activation,
//! the engine runs viewport cycles, and completions from the engine's request
//! tasks are fed back into it. Everything runs on the task that owns the
//! controller; the request tasks only post completions.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::{ConfigError, EngineConfig};
use crate::engine::{AggregationEngine, Completion};
use crate::layers::{Layer, LayerActivation, Transition};
use crate::map::{MapEvent, MapWidget, MarkerSink};
use crate::service::DataService;

pub struct CouchMap<M, S> {
    layers: LayerActivation,
    engine: AggregationEngine<M, S>,
    completions: mpsc::UnboundedReceiver<Completion>,
}

impl<M: MapWidget, S: MarkerSink> CouchMap<M, S> {
    pub fn new(
        config: EngineConfig,
        service: Arc<dyn DataService>,
        map: M,
        sink: S,
    ) -> Result<Self, ConfigError> {
        let (tx, completions) = mpsc::unbounded_channel();
        let engine = AggregationEngine::new(config, service, map, sink, tx)?;
        Ok(Self {
            layers: LayerActivation::new(),
            engine,
            completions,
        })
    }

    /// Show or hide a layer.
    pub fn set_layer(&mut self, layer: Layer, enabled: bool) -> Transition {
        let transition = self.layers.set_layer(layer, enabled, &mut self.engine);
        debug!(layer = %layer, enabled, ?transition, "Layer toggled");
        transition
    }

    pub fn viewport_changed(&mut self) {
        self.engine.on_viewport_change();
    }

    /// Wait for the next completion and apply it.
    ///
    /// Returns `false` if no request can complete any more.
    pub async fn process_next_completion(&mut self) -> bool {
        match self.completions.recv().await {
            Some(completion) => {
                self.engine.handle_completion(completion);
                true
            }
            None => false,
        }
    }

    /// Apply every completion already queued. Returns how many were applied.
    pub fn try_process_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions.try_recv() {
            self.engine.handle_completion(completion);
            applied += 1;
        }
        applied
    }

    /// Apply completions until no request is in flight.
    pub async fn settle(&mut self) {
        while self.engine.is_busy() {
            if !self.process_next_completion().await {
                break;
            }
        }
    }

    /// Process map events and completions until the map shuts down or its
    /// event channel closes.
    ///
    /// Events are handled in arrival order and are polled before completions,
    /// so a viewport change cancels outstanding requests before a completion
    /// that is already waiting can be applied.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<MapEvent>) -> Self {
        info!("Map controller running");
        loop {
            tokio::select! {
                biased;

                event = events.recv() => match event {
                    Some(MapEvent::ViewportChanged) => self.viewport_changed(),
                    Some(MapEvent::LayerToggled { layer, enabled }) => {
                        self.set_layer(layer, enabled);
                    }
                    Some(MapEvent::Shutdown) | None => break,
                },
                Some(completion) = self.completions.recv() => {
                    self.engine.handle_completion(completion);
                }
            }
        }
        self.engine.shutdown();
        info!("Map controller stopped");
        self
    }

    pub fn engine(&self) -> &AggregationEngine<M, S> {
        &self.engine
    }

    pub fn layers(&self) -> &LayerActivation {
        &self.layers
    }

    pub fn sink(&self) -> &S {
        self.engine.sink()
    }
}
