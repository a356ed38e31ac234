//! Coordinate type definitions

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom levels supported by the tile grid
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 22;

/// Errors raised when building coordinate types from untrusted input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("Invalid latitude: {0} (must be between -90 and 90)")]
    InvalidLatitude(f64),

    #[error("Invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),

    #[error("Invalid zoom level: {0} (must be between 0 and 22)")]
    InvalidZoom(u8),

    #[error("South edge {south} lies north of north edge {north}")]
    InvertedLatitude { south: f64, north: f64 },

    #[error("Invalid bounding box '{0}': expected 'south,west,north,east'")]
    Malformed(String),
}

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Arithmetic midpoint of two points.
    pub fn midpoint(&self, other: &LatLng) -> LatLng {
        LatLng {
            lat: (self.lat + other.lat) / 2.0,
            lng: (self.lng + other.lng) / 2.0,
        }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lng)
    }
}

/// Slippy-map tile address.
///
/// `x` grows eastwards from the anti-meridian, `y` grows southwards from the
/// top of the Mercator square. Both are in `[0, 2^zoom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Zoom level
    pub zoom: u8,
    /// X coordinate (east-west), 0 at the anti-meridian
    pub x: u32,
    /// Y coordinate (north-south), 0 at north
    pub y: u32,
}

impl TileCoord {
    #[inline]
    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    /// Northwest corner of the tile.
    #[inline]
    pub fn nw_corner(&self) -> LatLng {
        super::tile_to_lat_lng(self.x as i64, self.y as i64, self.zoom)
    }

    /// Southeast corner of the tile (the northwest corner of the diagonal neighbour).
    #[inline]
    pub fn se_corner(&self) -> LatLng {
        super::tile_to_lat_lng(self.x as i64 + 1, self.y as i64 + 1, self.zoom)
    }

    /// Midpoint of the two opposite corners.
    ///
    /// This is where aggregated markers are placed. It is not the Mercator
    /// center of the tile; latitude is averaged in degrees.
    pub fn midpoint(&self) -> LatLng {
        self.nw_corner().midpoint(&self.se_corner())
    }

    /// Geographic extent of the tile.
    pub fn bounds(&self) -> GeoBBox {
        let nw = self.nw_corner();
        let se = self.se_corner();
        GeoBBox {
            south: se.lat,
            west: nw.lng,
            north: nw.lat,
            east: se.lng,
        }
    }

    /// View key used by grouped-count queries: `[zoom, x, y]`.
    pub fn key(&self) -> [u32; 3] {
        [self.zoom as u32, self.x, self.y]
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Geographic bounding box in degrees.
///
/// `south <= north` always holds. When `west > east` the box crosses the
/// anti-meridian and its longitude span wraps through ±180.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBBox {
    /// Create a validated bounding box.
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self, CoordError> {
        for lat in [south, north] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(CoordError::InvalidLatitude(lat));
            }
        }
        for lon in [west, east] {
            if !(MIN_LON..=MAX_LON).contains(&lon) {
                return Err(CoordError::InvalidLongitude(lon));
            }
        }
        if south > north {
            return Err(CoordError::InvertedLatitude { south, north });
        }
        Ok(Self {
            south,
            west,
            north,
            east,
        })
    }

    /// Whether the longitude span wraps through ±180.
    #[inline]
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Closed containment test.
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        if lat < self.south || lat > self.north {
            return false;
        }
        if self.crosses_antimeridian() {
            lng >= self.west || lng <= self.east
        } else {
            lng >= self.west && lng <= self.east
        }
    }

    /// Longitude span in degrees, accounting for wrap.
    pub fn width(&self) -> f64 {
        if self.crosses_antimeridian() {
            self.east + 360.0 - self.west
        } else {
            self.east - self.west
        }
    }

    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    pub fn center(&self) -> LatLng {
        let mut lng = self.west + self.width() / 2.0;
        if lng > MAX_LON {
            lng -= 360.0;
        }
        LatLng {
            lat: (self.south + self.north) / 2.0,
            lng,
        }
    }

    /// Split a wrapping box into its eastern-hemisphere and western-hemisphere parts.
    ///
    /// A box that does not wrap is returned unchanged with `None`.
    pub fn split_at_antimeridian(&self) -> (GeoBBox, Option<GeoBBox>) {
        if !self.crosses_antimeridian() {
            return (*self, None);
        }
        let east_part = GeoBBox {
            east: MAX_LON,
            ..*self
        };
        let west_part = GeoBBox {
            west: MIN_LON,
            ..*self
        };
        (east_part, Some(west_part))
    }

    /// Closed intersection test. Either box may wrap.
    pub fn intersects(&self, other: &GeoBBox) -> bool {
        if self.north < other.south || other.north < self.south {
            return false;
        }
        let (a1, a2) = self.split_at_antimeridian();
        let (b1, b2) = other.split_at_antimeridian();
        let lon_overlap = |a: &GeoBBox, b: &GeoBBox| a.west <= b.east && b.west <= a.east;
        [Some(a1), a2].iter().flatten().any(|a| {
            [Some(b1), b2]
                .iter()
                .flatten()
                .any(|b| lon_overlap(a, b))
        })
    }

    /// The four corners as (lat, lng) points: SW, NW, NE, SE.
    pub fn corners(&self) -> [LatLng; 4] {
        [
            LatLng::new(self.south, self.west),
            LatLng::new(self.north, self.west),
            LatLng::new(self.north, self.east),
            LatLng::new(self.south, self.east),
        ]
    }

    /// `west,south,east,north`, the order spatial views expect in a `bbox` parameter.
    pub fn to_bbox_string(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

impl fmt::Display for GeoBBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.5},{:.5} → {:.5},{:.5}]",
            self.south, self.west, self.north, self.east
        )
    }
}

/// Parses `south,west,north,east` (the field order of [`GeoBBox`]).
impl FromStr for GeoBBox {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| CoordError::Malformed(s.to_string()))?;

        match parts.as_slice() {
            [south, west, north, east] => GeoBBox::new(*south, *west, *north, *east),
            _ => Err(CoordError::Malformed(s.to_string())),
        }
    }
}
