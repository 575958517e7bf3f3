use crate::core::constants::{BASE, MASK, MAX_LATITUDE, MILLIMETERS_PER_METER, WORLD_BITS};
use serde::{Deserialize, Serialize};
use std::{
    f64::consts::PI,
    hash::{Hash, Hasher},
};

/// A point on the Earth's surface in the WGS84 datum.
///
/// Longitude and latitude are in degrees (east and north positive), altitude
/// in meters above the ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default)]
    pub altitude: f64,
}

impl GeoPoint {
    /// Creates a new GeoPoint at zero altitude
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self::with_altitude(longitude, latitude, 0.0)
    }

    pub fn with_altitude(longitude: f64, latitude: f64, altitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            altitude,
        }
    }

    /// Projects into the fixed-point spherical Mercator plane.
    ///
    /// x and y are clamped to `[0, MASK]`; latitudes beyond the Mercator
    /// limit land on the top or bottom edge.
    pub fn to_map_point(&self) -> MapPoint {
        let lat_rad = self.latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = (self.longitude + 180.0) / 360.0;
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;

        MapPoint::with_altitude(
            to_map_int(x),
            to_map_int(y),
            (self.altitude * MILLIMETERS_PER_METER).round() as i32,
        )
    }
}

impl Default for GeoPoint {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A point in the fixed-point spherical Mercator plane.
///
/// `x` and `y` are fractions of a full world wrap scaled by [`BASE`], so valid
/// values lie in `[0, BASE - 1]`; `x` grows eastwards and `y` southwards.
/// `z` is altitude in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub z: i32,
}

impl MapPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y, z: 0 }
    }

    pub fn with_altitude(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Converts back to the WGS84 datum.
    pub fn to_geo_point(&self) -> GeoPoint {
        GeoPoint::with_altitude(
            to_map_double(self.x) * 360.0 - 180.0,
            (PI - 2.0 * PI * to_map_double(self.y)).sinh().atan().to_degrees(),
            self.z as f64 / MILLIMETERS_PER_METER,
        )
    }

    /// Moves the point by a delta, wrapping both axes modulo [`BASE`].
    pub fn wrapping_offset(&self, dx: i64, dy: i64) -> MapPoint {
        MapPoint::with_altitude(
            wrap_coordinate(self.x as i64 + dx),
            wrap_coordinate(self.y as i64 + dy),
            self.z,
        )
    }
}

/// Free-function form of [`GeoPoint::to_map_point`].
pub fn to_projected(point: &GeoPoint) -> MapPoint {
    point.to_map_point()
}

/// Free-function form of [`MapPoint::to_geo_point`].
pub fn to_geographic(point: &MapPoint) -> GeoPoint {
    point.to_geo_point()
}

/// Converts a fixed-point component to a fraction of the world.
pub fn to_map_double(v: i32) -> f64 {
    v as f64 / BASE as f64
}

/// Converts a fraction of the world to a fixed-point component, clamped to
/// `[0, MASK]`. Out-of-range input is never wrapped.
pub fn to_map_int(v: f64) -> i32 {
    let scaled = (v * BASE as f64).round();
    if scaled.is_nan() {
        return 0;
    }
    scaled.clamp(0.0, MASK as f64) as i32
}

/// Reduces an unbounded coordinate modulo [`BASE`].
pub fn wrap_coordinate(v: i64) -> i32 {
    (v & MASK as i64) as i32
}

/// Represents a point in screen, pixel or intermediate map space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a tile coordinate in the slippy map tile pyramid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Creates a tile coordinate from grid positions, wrapping both axes
    /// modulo the tile count at `z`.
    pub fn wrapped(grid_x: i64, grid_y: i64, z: u8) -> Self {
        let count = 1_i64 << z;
        Self::new(
            grid_x.rem_euclid(count) as u32,
            grid_y.rem_euclid(count) as u32,
            z,
        )
    }

    /// The tile containing a projected point at the given zoom level.
    pub fn containing(point: &MapPoint, zoom: u8) -> Self {
        let shift = WORLD_BITS - zoom as i32;
        Self::new(
            ((point.x & MASK) >> shift) as u32,
            ((point.y & MASK) >> shift) as u32,
            zoom,
        )
    }

    /// Packs the coordinate into a single key: 24 bits of x, 24 bits of y and
    /// 8 bits of zoom.
    pub fn packed(&self) -> u64 {
        ((self.x as u64 & 0xFF_FFFF) << 32) | ((self.y as u64 & 0xFF_FFFF) << 8) | self.z as u64
    }

    /// Row index counted from the bottom, as used by TMS-style stores.
    pub fn tms_row(&self) -> u32 {
        (1_u32 << self.z) - self.y - 1
    }

    /// Gets the parent tile at a lower zoom level
    pub fn parent(&self) -> Option<TileCoord> {
        if self.z == 0 {
            None
        } else {
            Some(TileCoord::new(self.x / 2, self.y / 2, self.z - 1))
        }
    }

    /// The four children at `z + 1`, ordered top-left, top-right,
    /// bottom-left, bottom-right.
    pub fn children(&self) -> [TileCoord; 4] {
        let (x, y, z) = (self.x * 2, self.y * 2, self.z + 1);
        [
            TileCoord::new(x, y, z),
            TileCoord::new(x + 1, y, z),
            TileCoord::new(x, y + 1, z),
            TileCoord::new(x + 1, y + 1, z),
        ]
    }
}

impl Hash for TileCoord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.packed());
    }
}
