//! Prelude module for common slipmap types and traits
//!
//! Re-exports the most commonly used types for `use slipmap::prelude::*;`

pub use crate::core::{
    bounds::{rect_contains_point, rect_contains_rect, rect_intersects, MapRect},
    config::{EngineOptions, EngineProfile, TileCacheConfig},
    constants::{BASE, MASK, ZOOM_MULTIPLIER},
    geo::{GeoPoint, MapPoint, Point, TileCoord},
    map::{Map, MapOptions},
    projection::{Projection, RawClip, TileRange, Viewpoint},
};

pub use crate::geometry::{closest_t_on_segment, distance, interpolate};

pub use crate::spatial::{IndexNode, StaticIndex, TypeFilter, ANY_TYPE};

pub use crate::tiles::{
    MemoryTileSource, PlannedTile, RawTileSource, TileCache, TileCallback, TileImage, TileLayer,
    TileLoader, TilePlan, TileSource, TileSourceMetadata,
};

#[cfg(feature = "image-decode")]
pub use crate::tiles::DecodingTileSource;

pub use crate::traits::{Lerp, MatrixTransform};

pub use crate::{Error, MapError, Result};

pub use std::sync::Arc;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};
