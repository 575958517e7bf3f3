//! # slipmap
//!
//! A slippy-map engine built on a 30-bit fixed-point spherical Mercator
//! plane.
//!
//! The crate converts geographic coordinates into that plane, answers range
//! queries with x-axis wraparound against a prebuilt static index, keeps the
//! pan/zoom/rotation state of a view, and feeds a renderer decoded tiles from
//! a byte-bounded cache filled by a background loader. Drawing, input
//! handling and networking are left to the embedding application.

pub mod core;
pub mod geometry;
pub mod prelude;
pub mod spatial;
pub mod tiles;
pub mod traits;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    bounds::MapRect,
    config::{EngineOptions, EngineProfile, TileCacheConfig},
    geo::{GeoPoint, MapPoint, Point, TileCoord},
    map::{Map, MapOptions},
    projection::{Projection, TileRange, Viewpoint},
};

pub use spatial::{IndexNode, StaticIndex, TypeFilter};

pub use tiles::{
    TileCache, TileImage, TileLayer, TileLoader, TilePlan, TileSource, TileSourceMetadata,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Truncated data: needed {expected} bytes, found {available}")]
    Truncated { expected: usize, available: usize },

    #[error("Corrupt format: {0}")]
    CorruptFormat(String),

    #[error("Tile decode error: {0}")]
    TileDecode(String),

    #[error("Tile source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error type alias for convenience
pub type Error = MapError;
