//! Bounding-box tiler.
//!
//! Covers a geographic bounding box with the tiles of a single zoom level.
//! The search starts at the tile under the box center and walks outwards one
//! row or column at a time in each direction, probing the tile edge at the
//! center's perpendicular coordinate, until the edge leaves the box:
//!
//! ```text
//!            ymin
//!             ▲
//!   xmin ◄────C────► xmax      C = tile under the center
//!             ▼
//!            ymax
//! ```
//!
//! The result is every tile with `xmin <= x < xmax` and `ymin <= y < ymax`,
//! in row-major order. Nothing bounds the size of the result, so callers pick
//! the zoom level conservatively, or check [`tile_count_in_bbox`] first.
//!
//! Zoom levels above [`MAX_ZOOM`] are treated as [`MAX_ZOOM`].

use super::{lat_to_tile_y, lon_to_tile_x, tile_x_to_lon, tile_y_to_lat};
use super::{GeoBBox, TileCoord, MAX_LAT, MAX_ZOOM, MIN_LAT};

/// Half-open block of tile columns and rows at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TileRange {
    zoom: u8,
    xmin: i64,
    xmax: i64,
    ymin: i64,
    ymax: i64,
}

impl TileRange {
    fn len(&self) -> u64 {
        ((self.xmax - self.xmin) * (self.ymax - self.ymin)) as u64
    }

    fn overlap(&self, other: &TileRange) -> u64 {
        let width = self.xmax.min(other.xmax) - self.xmin.max(other.xmin);
        let height = self.ymax.min(other.ymax) - self.ymin.max(other.ymin);
        if width <= 0 || height <= 0 {
            0
        } else {
            (width * height) as u64
        }
    }

    fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (self.ymin..self.ymax).flat_map(move |row| {
            (self.xmin..self.xmax)
                .map(move |col| TileCoord::new(self.zoom, col as u32, row as u32))
        })
    }
}

/// Enumerates the tiles at `zoom` covering `bbox`.
///
/// A box that crosses the anti-meridian is tiled as its two halves; the
/// result then contains no duplicates but is still sorted row-major.
/// A box degenerate to a point or a line still yields the tile under it.
pub fn tiles_in_bbox(bbox: &GeoBBox, zoom: u8) -> Vec<TileCoord> {
    let (first, second) = spans(bbox, zoom);
    let mut tiles: Vec<TileCoord> = first.tiles().collect();

    if let Some(second) = second {
        tiles.extend(second.tiles());
        tiles.sort_by_key(|t| (t.y, t.x));
        tiles.dedup();
    }

    tiles
}

/// Number of tiles [`tiles_in_bbox`] would return, without building them.
pub fn tile_count_in_bbox(bbox: &GeoBBox, zoom: u8) -> u64 {
    match spans(bbox, zoom) {
        (first, Some(second)) => first.len() + second.len() - first.overlap(&second),
        (first, None) => first.len(),
    }
}

fn spans(bbox: &GeoBBox, zoom: u8) -> (TileRange, Option<TileRange>) {
    let zoom = zoom.min(MAX_ZOOM);
    let (first, second) = bbox.split_at_antimeridian();
    (
        span_range(&first, zoom),
        second.map(|second| span_range(&second, zoom)),
    )
}

/// Tile block covering a box that does not wrap.
fn span_range(bbox: &GeoBBox, zoom: u8) -> TileRange {
    let n = 1_i64 << zoom;
    let center = bbox.center();
    let x = lon_to_tile_x(center.lng, zoom).clamp(0, n - 1);
    let y = lat_to_tile_y(center.lat.clamp(MIN_LAT, MAX_LAT), zoom).clamp(0, n - 1);

    // West edges of columns, probed along the center latitude
    let mut xmin = x;
    while xmin > 0 && bbox.contains(center.lat, tile_x_to_lon(xmin, zoom)) {
        xmin -= 1;
    }
    let mut xmax = x + 1;
    while xmax < n && bbox.contains(center.lat, tile_x_to_lon(xmax, zoom)) {
        xmax += 1;
    }

    // North edges of rows, probed along the center longitude
    let mut ymin = y;
    while ymin > 0 && bbox.contains(tile_y_to_lat(ymin, zoom), center.lng) {
        ymin -= 1;
    }
    let mut ymax = y + 1;
    while ymax < n && bbox.contains(tile_y_to_lat(ymax, zoom), center.lng) {
        ymax += 1;
    }

    TileRange {
        zoom,
        xmin,
        xmax,
        ymin,
        ymax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::tile_containing;

    fn bbox(south: f64, west: f64, north: f64, east: f64) -> GeoBBox {
        GeoBBox::new(south, west, north, east).unwrap()
    }

    #[test]
    fn test_bbox_inside_one_tile_yields_one_tile() {
        // Lower Manhattan, about 40.65..40.71°N and 74.00..73.92°W
        let tile = TileCoord::new(12, 1206, 1540);
        let b = tile.bounds();
        let inner = bbox(
            b.south + b.height() * 0.25,
            b.west + b.width() * 0.25,
            b.north - b.height() * 0.25,
            b.east - b.width() * 0.25,
        );

        assert_eq!(tiles_in_bbox(&inner, 12), vec![tile]);
    }

    #[test]
    fn test_point_bbox_yields_center_tile() {
        let point = bbox(40.5, -73.5, 40.5, -73.5);
        let tiles = tiles_in_bbox(&point, 12);
        assert_eq!(tiles, vec![tile_containing(40.5, -73.5, 12)]);
    }

    #[test]
    fn test_line_bbox_yields_a_row() {
        let line = bbox(40.5, -74.0, 40.5, -73.0);
        let tiles = tiles_in_bbox(&line, 12);

        assert!(tiles.len() > 1);
        assert!(tiles.iter().all(|t| t.y == tiles[0].y));
        let xs: Vec<u32> = tiles.iter().map(|t| t.x).collect();
        let expected: Vec<u32> = (xs[0]..xs[0] + xs.len() as u32).collect();
        assert_eq!(xs, expected, "columns should be contiguous");
    }

    #[test]
    fn test_new_york_degree_square_at_zoom_12() {
        let b = bbox(40.0, -74.0, 41.0, -73.0);
        let tiles = tiles_in_bbox(&b, 12);

        let nw = tile_containing(41.0, -74.0, 12);
        let se = tile_containing(40.0, -73.0, 12);
        let width = (se.x - nw.x + 1) as usize;
        let height = (se.y - nw.y + 1) as usize;
        assert_eq!(tiles.len(), width * height);
        assert_eq!(tiles.first(), Some(&nw));
        assert_eq!(tiles.last(), Some(&se));
    }

    #[test]
    fn test_row_major_order() {
        let b = bbox(40.0, -74.0, 41.0, -73.0);
        let tiles = tiles_in_bbox(&b, 10);
        let mut sorted = tiles.clone();
        sorted.sort_by_key(|t| (t.y, t.x));
        assert_eq!(tiles, sorted);
    }

    #[test]
    fn test_zoom_zero_world() {
        let world = bbox(-90.0, -180.0, 90.0, 180.0);
        assert_eq!(tiles_in_bbox(&world, 0), vec![TileCoord::new(0, 0, 0)]);
    }

    #[test]
    fn test_world_is_clamped_to_grid() {
        let world = bbox(-90.0, -180.0, 90.0, 180.0);
        let tiles = tiles_in_bbox(&world, 3);
        assert_eq!(tiles.len(), 64);
        assert!(tiles.iter().all(|t| t.x < 8 && t.y < 8));
    }

    #[test]
    fn test_antimeridian_box_covers_both_sides() {
        let b = bbox(-5.0, 175.0, 5.0, -175.0);
        let tiles = tiles_in_bbox(&b, 6);

        let last_col = (1u32 << 6) - 1;
        assert!(tiles.iter().any(|t| t.x == last_col));
        assert!(tiles.iter().any(|t| t.x == 0));
        assert!(tiles.iter().all(|t| t.x <= 1 || t.x >= last_col - 1));

        let mut deduped = tiles.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), tiles.len());
    }

    #[test]
    fn test_tile_count_matches_enumeration() {
        let boxes = [
            bbox(40.0, -74.0, 41.0, -73.0),
            bbox(-5.0, 175.0, 5.0, -175.0),
            // Wraps almost the whole way round, so both halves share columns
            bbox(-10.0, -170.0, 10.0, -175.0),
            bbox(40.5, -73.5, 40.5, -73.5),
        ];
        for b in &boxes {
            for zoom in [0, 4, 9] {
                assert_eq!(
                    tile_count_in_bbox(b, zoom),
                    tiles_in_bbox(b, zoom).len() as u64,
                    "{} at zoom {}",
                    b,
                    zoom
                );
            }
        }
    }

    #[test]
    fn test_world_count_at_max_zoom() {
        let world = bbox(-90.0, -180.0, 90.0, 180.0);
        assert_eq!(tile_count_in_bbox(&world, MAX_ZOOM), 1_u64 << (2 * MAX_ZOOM));
    }

    #[test]
    fn test_zoom_above_max_is_clamped() {
        let b = bbox(40.7, -74.0, 40.71, -73.99);
        let tiles = tiles_in_bbox(&b, 64);

        assert_eq!(tiles, tiles_in_bbox(&b, MAX_ZOOM));
        assert!(tiles.iter().all(|t| t.zoom == MAX_ZOOM));
        assert_eq!(tile_count_in_bbox(&b, u8::MAX), tiles.len() as u64);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_bbox() -> impl Strategy<Value = GeoBBox> {
            (-80.0..80.0_f64, -179.0..179.0_f64, 0.0..5.0_f64, 0.0..5.0_f64).prop_map(
                |(south, west, h, w)| {
                    GeoBBox::new(south, west, (south + h).min(84.0), (west + w).min(180.0))
                        .unwrap()
                },
            )
        }

        proptest! {
            #[test]
            fn test_every_tile_intersects_bbox(b in arb_bbox(), zoom in 0u8..=10) {
                for tile in tiles_in_bbox(&b, zoom) {
                    prop_assert!(
                        tile.bounds().intersects(&b),
                        "tile {} ({:?}) does not touch {}", tile, tile.bounds(), b
                    );
                }
            }

            #[test]
            fn test_corners_are_covered(b in arb_bbox(), zoom in 0u8..=10) {
                let tiles = tiles_in_bbox(&b, zoom);
                for corner in b.corners() {
                    prop_assert!(
                        tiles.iter().any(|t| t.bounds().contains(corner.lat, corner.lng)),
                        "corner {} not covered by {:?}", corner, tiles
                    );
                }
            }

            #[test]
            fn test_never_empty(b in arb_bbox(), zoom in 0u8..=12) {
                prop_assert!(!tiles_in_bbox(&b, zoom).is_empty());
            }
        }
    }
}
