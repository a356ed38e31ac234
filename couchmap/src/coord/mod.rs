//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and slippy-map tile indices, plus the bounding-box tiler used to cover a
//! viewport with tiles.
//!
//! The tile-index functions work on `i64` so that callers probing past the
//! edge of the grid (the tiler does this while expanding) get well-defined
//! values instead of wrapped unsigned integers.

mod bbox;
mod types;

pub use bbox::{tile_count_in_bbox, tiles_in_bbox};
pub use types::{
    CoordError, GeoBBox, LatLng, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
    MIN_ZOOM,
};

use std::f64::consts::PI;

/// Values this close (in tile units) to a tile edge are snapped onto the edge
/// before flooring, absorbing rounding error from the inverse functions.
const EDGE_EPSILON: f64 = 1e-6;

/// Number of tiles along one axis at `zoom`.
#[inline]
fn tiles_per_axis(zoom: u8) -> f64 {
    2.0_f64.powi(zoom as i32)
}

#[inline]
fn snap_floor(value: f64) -> i64 {
    let nearest = value.round();
    if (value - nearest).abs() < EDGE_EPSILON {
        nearest as i64
    } else {
        value.floor() as i64
    }
}

/// Converts a longitude to the tile column containing it.
#[inline]
pub fn lon_to_tile_x(lon: f64, zoom: u8) -> i64 {
    snap_floor((lon + 180.0) / 360.0 * tiles_per_axis(zoom))
}

/// Converts a latitude to the tile row containing it (Web Mercator).
#[inline]
pub fn lat_to_tile_y(lat: f64, zoom: u8) -> i64 {
    let lat_rad = lat * PI / 180.0;
    snap_floor((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * tiles_per_axis(zoom))
}

/// Longitude of the west edge of tile column `x`.
#[inline]
pub fn tile_x_to_lon(x: i64, zoom: u8) -> f64 {
    x as f64 / tiles_per_axis(zoom) * 360.0 - 180.0
}

/// Latitude of the north edge of tile row `y` (inverse Web Mercator).
#[inline]
pub fn tile_y_to_lat(y: i64, zoom: u8) -> f64 {
    let n = PI * (1.0 - 2.0 * y as f64 / tiles_per_axis(zoom));
    n.sinh().atan() * 180.0 / PI
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lng(x: i64, y: i64, zoom: u8) -> LatLng {
    LatLng {
        lat: tile_y_to_lat(y, zoom),
        lng: tile_x_to_lon(x, zoom),
    }
}

/// Tile containing a point, clamped onto the grid.
///
/// Latitudes beyond the Mercator limit map to the first or last row and
/// longitude 180 maps to the last column. Zoom levels above [`MAX_ZOOM`]
/// are treated as [`MAX_ZOOM`].
pub fn tile_containing(lat: f64, lng: f64, zoom: u8) -> TileCoord {
    let zoom = zoom.min(MAX_ZOOM);
    let last = (1_i64 << zoom) - 1;
    let x = lon_to_tile_x(lng, zoom).clamp(0, last);
    let y = lat_to_tile_y(lat.clamp(MIN_LAT, MAX_LAT), zoom).clamp(0, last);
    TileCoord::new(zoom, x as u32, y as u32)
}
