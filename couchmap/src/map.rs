//! Map widget and marker rendering contracts.
//!
//! The engine never draws anything itself. It reads the viewport from a
//! [`MapWidget`] and pushes markers into a [`MarkerSink`]. [`HeadlessMap`] and
//! [`RecordingSink`] are in-process implementations used by the CLI and tests.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::coord::{GeoBBox, LatLng, TileCoord};
use crate::layers::Layer;
use crate::service::{CoarseCountRow, PointRow};

/// What the map currently shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub bbox: GeoBBox,
    pub zoom: u8,
    /// Highest zoom the map widget can display.
    pub max_zoom: u8,
}

impl Viewport {
    pub fn new(bbox: GeoBBox, zoom: u8, max_zoom: u8) -> Self {
        Self {
            bbox,
            zoom,
            max_zoom,
        }
    }
}

/// Events a map widget delivers to the controller loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    /// The viewport moved or zoomed. Only sent while subscribed.
    ViewportChanged,
    /// A layer control was switched.
    LayerToggled { layer: Layer, enabled: bool },
    /// The map is going away.
    Shutdown,
}

/// The parts of a map widget the engine depends on.
pub trait MapWidget {
    fn viewport(&self) -> Viewport;

    /// Start delivering [`MapEvent::ViewportChanged`].
    fn subscribe(&mut self);

    /// Stop delivering [`MapEvent::ViewportChanged`].
    fn unsubscribe(&mut self);
}

/// One aggregated marker: a tile's point count placed inside the tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoarseMarker {
    pub tile: TileCoord,
    pub position: LatLng,
    pub count: u64,
}

impl CoarseMarker {
    /// Marker for a grouped-count row, at the midpoint of the tile's corners.
    pub fn from_row(row: &CoarseCountRow) -> Self {
        Self {
            tile: row.tile,
            position: row.tile.midpoint(),
            count: row.count,
        }
    }

    pub fn label(&self) -> String {
        self.count.to_string()
    }
}

/// Receives rendering commands for the nodes layer.
///
/// Coarse markers and exact points share the layer; the engine clears one
/// before showing the other.
pub trait MarkerSink {
    fn clear_coarse(&mut self);

    fn add_coarse(&mut self, marker: CoarseMarker);

    /// Hand raw point rows to the clustering collaborator.
    fn show_points(&mut self, rows: Vec<PointRow>);

    fn clear_points(&mut self);
}

#[derive(Debug)]
struct MapState {
    viewport: Viewport,
    subscribed: bool,
}

/// A map widget without a screen.
///
/// Clones share state, so one clone can be moved into the engine while
/// another drives it with [`HeadlessMap::move_to`].
#[derive(Debug, Clone)]
pub struct HeadlessMap {
    state: Arc<Mutex<MapState>>,
    events: mpsc::UnboundedSender<MapEvent>,
}

impl HeadlessMap {
    /// Creates a map showing `viewport`, and the receiver for its events.
    pub fn new(viewport: Viewport) -> (Self, mpsc::UnboundedReceiver<MapEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let map = Self {
            state: Arc::new(Mutex::new(MapState {
                viewport,
                subscribed: false,
            })),
            events,
        };
        (map, rx)
    }

    /// Pan or zoom the map. Emits a viewport change if anyone is subscribed.
    pub fn move_to(&self, viewport: Viewport) {
        let subscribed = {
            let mut state = self.state.lock();
            state.viewport = viewport;
            state.subscribed
        };
        if subscribed {
            let _ = self.events.send(MapEvent::ViewportChanged);
        }
    }

    pub fn toggle_layer(&self, layer: Layer, enabled: bool) {
        let _ = self.events.send(MapEvent::LayerToggled { layer, enabled });
    }

    pub fn close(&self) {
        let _ = self.events.send(MapEvent::Shutdown);
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.lock().subscribed
    }
}

impl MapWidget for HeadlessMap {
    fn viewport(&self) -> Viewport {
        self.state.lock().viewport
    }

    fn subscribe(&mut self) {
        self.state.lock().subscribed = true;
    }

    fn unsubscribe(&mut self) {
        self.state.lock().subscribed = false;
    }
}

/// A marker sink that keeps what it was given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    coarse: Vec<CoarseMarker>,
    points: Vec<PointRow>,
    coarse_swaps: usize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coarse markers currently shown.
    pub fn coarse(&self) -> &[CoarseMarker] {
        &self.coarse
    }

    /// Point rows currently shown.
    pub fn points(&self) -> &[PointRow] {
        &self.points
    }

    /// How many times the coarse layer was cleared.
    pub fn coarse_swaps(&self) -> usize {
        self.coarse_swaps
    }

    pub fn is_empty(&self) -> bool {
        self.coarse.is_empty() && self.points.is_empty()
    }
}

impl MarkerSink for RecordingSink {
    fn clear_coarse(&mut self) {
        self.coarse.clear();
        self.coarse_swaps += 1;
    }

    fn add_coarse(&mut self, marker: CoarseMarker) {
        self.coarse.push(marker);
    }

    fn show_points(&mut self, rows: Vec<PointRow>) {
        self.points = rows;
    }

    fn clear_points(&mut self) {
        self.points.clear();
    }
}
