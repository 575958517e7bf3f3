//! Configuration for the engine's tile cache and map setup.
//!
//! Options can be built from a preset profile or deserialized from JSON, and
//! are turned into runtime objects with `into_map` / `TileLoader::new`.

use crate::{
    core::{constants::DEFAULT_CACHE_BYTES, map::MapOptions},
    Result,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineProfile {
    Balanced,
    LowMemory,
    HighMemory,
    Custom(EngineOptions),
}

impl EngineProfile {
    pub fn resolve(&self) -> EngineOptions {
        match self {
            Self::Balanced => EngineOptions {
                tile_cache: TileCacheConfig {
                    max_bytes: DEFAULT_CACHE_BYTES,
                    ..Default::default()
                },
                map: MapOptions::default(),
            },
            Self::LowMemory => EngineOptions {
                tile_cache: TileCacheConfig {
                    max_bytes: 8 * 1024 * 1024,
                    ..Default::default()
                },
                map: MapOptions {
                    max_zoom: 18,
                    ..Default::default()
                },
            },
            Self::HighMemory => EngineOptions {
                tile_cache: TileCacheConfig {
                    max_bytes: 128 * 1024 * 1024,
                    ..Default::default()
                },
                map: MapOptions::default(),
            },
            Self::Custom(options) => options.clone(),
        }
    }
}

impl Default for EngineProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub tile_cache: TileCacheConfig,
    pub map: MapOptions,
}

impl EngineOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileCacheConfig {
    /// Upper bound on the decoded bytes held by the cache.
    pub max_bytes: usize,
    /// Name given to the background loader thread.
    pub worker_name: String,
}

impl TileCacheConfig {
    /// Rough number of full tiles of the given edge that fit in the budget.
    pub fn estimated_tile_capacity(&self, tile_size: u32) -> usize {
        let tile_bytes = tile_size as usize * tile_size as usize * 4;
        if tile_bytes == 0 {
            0
        } else {
            self.max_bytes / tile_bytes
        }
    }
}

impl Default for TileCacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_CACHE_BYTES,
            worker_name: "slipmap-tile-loader".to_string(),
        }
    }
}
