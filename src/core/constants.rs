//! Engine-wide constants for the fixed-point projection and viewport math.
//! Keeping them in a single place makes the bit-level assumptions easy to audit.

/// Fixed-point denominator for one full world width/height (2^30).
pub const BASE: i32 = 1 << 30;

/// Mask that keeps projected coordinates inside `[0, BASE - 1]`.
pub const MASK: i32 = 0x3FFF_FFFF;

/// Number of bits used by projected coordinates.
pub const WORLD_BITS: i32 = 30;

/// Zoom sub-units per integer zoom level.
pub const ZOOM_MULTIPLIER: i32 = 64;

/// Altitudes are stored in millimeters.
pub const MILLIMETERS_PER_METER: f64 = 1000.0;

/// WGS84 semi-major axis in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the square spherical-Mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Default square tile edge in pixels.
pub const TILE_SIZE: u32 = 256;

/// Default tile edge as a power of two.
pub const TILE_SIZE_POWER: i32 = 8;

/// Default zoom limits of a freshly created map.
pub const DEFAULT_MIN_ZOOM: i32 = 0;
pub const DEFAULT_MAX_ZOOM: i32 = 21;

/// Default byte budget of the decoded tile cache (32 MiB).
pub const DEFAULT_CACHE_BYTES: usize = 32 * 1024 * 1024;
