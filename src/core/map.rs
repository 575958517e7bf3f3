use crate::{
    core::{
        bounds::MapRect,
        constants::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, MASK, TILE_SIZE},
    },
    tiles::source::TileSourceMetadata,
    MapError, Result,
};
use serde::{Deserialize, Serialize};

/// Serializable description of a map, validated into a [`Map`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    pub min_zoom: i32,
    pub max_zoom: i32,
    pub tile_size: u32,
    /// `[min_x, min_y, max_x, max_y]` in fixed-point units; the whole world
    /// when absent.
    pub bounds: Option<[i32; 4]>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            tile_size: TILE_SIZE,
            bounds: None,
        }
    }
}

impl MapOptions {
    pub fn into_map(self) -> Result<Map> {
        Map::from_options(&self)
    }
}

/// The map configuration read by a [`Projection`](crate::core::projection::Projection):
/// the bounds of the data, the zoom range and the tile edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Map {
    bounds: MapRect,
    min_zoom: i32,
    max_zoom: i32,
    tile_size: u32,
}

impl Default for Map {
    fn default() -> Self {
        Self {
            bounds: MapRect::world(),
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            tile_size: TILE_SIZE,
        }
    }
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_options(options: &MapOptions) -> Result<Self> {
        let bounds = match options.bounds {
            Some([min_x, min_y, max_x, max_y]) => MapRect::new(min_x, min_y, max_x, max_y),
            None => MapRect::world(),
        };

        let map = Self {
            bounds,
            min_zoom: options.min_zoom,
            max_zoom: options.max_zoom,
            tile_size: options.tile_size,
        };
        map.validate()?;
        Ok(map)
    }

    /// Configures a map from tile source metadata. The south-west/north-east
    /// bounds become a rectangle with the north-west corner as its minimum.
    pub fn from_metadata(metadata: &TileSourceMetadata) -> Result<Self> {
        let bounds = match &metadata.bounds {
            Some([south_west, north_east]) => MapRect::from_geo_bounds(
                south_west.longitude,
                south_west.latitude,
                north_east.longitude,
                north_east.latitude,
            ),
            None => MapRect::world(),
        };

        let map = Self {
            bounds,
            min_zoom: metadata.min_zoom,
            max_zoom: metadata.max_zoom,
            tile_size: metadata.tile_width,
        };
        map.validate()?;
        Ok(map)
    }

    pub fn with_bounds(mut self, bounds: MapRect) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: i32, max_zoom: i32) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Checks the zoom range, tile edge and bounds.
    pub fn validate(&self) -> Result<()> {
        if self.min_zoom < 0 || self.max_zoom > 30 || self.min_zoom > self.max_zoom {
            return Err(MapError::InvalidConfig(format!(
                "zoom range {}..={} is not within 0..=30",
                self.min_zoom, self.max_zoom
            )));
        }
        if !self.tile_size.is_power_of_two() || self.tile_size_power() > 30 {
            return Err(MapError::InvalidConfig(format!(
                "tile size {} is not a power of two",
                self.tile_size
            )));
        }
        let b = &self.bounds;
        let in_range = |v: i32| (0..=MASK).contains(&v);
        if !(in_range(b.min_x) && in_range(b.min_y) && in_range(b.max_x) && in_range(b.max_y))
            || b.min_y > b.max_y
        {
            return Err(MapError::InvalidConfig(format!("bounds {} out of range", b)));
        }
        Ok(())
    }

    pub fn bounds(&self) -> &MapRect {
        &self.bounds
    }

    pub fn set_bounds(&mut self, bounds: MapRect) {
        self.bounds = bounds;
    }

    pub fn min_zoom(&self) -> i32 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> i32 {
        self.max_zoom
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Tile edge as a power of two.
    pub fn tile_size_power(&self) -> i32 {
        self.tile_size.trailing_zeros() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::GeoPoint;

    #[test]
    fn test_default_map() {
        let map = Map::new();
        assert_eq!(*map.bounds(), MapRect::world());
        assert_eq!(map.min_zoom(), 0);
        assert_eq!(map.max_zoom(), 21);
        assert_eq!(map.tile_size_power(), 8);
        assert!(map.validate().is_ok());
    }

    #[test]
    fn test_options_validation() {
        let bad_tile = MapOptions {
            tile_size: 300,
            ..Default::default()
        };
        assert!(matches!(
            bad_tile.into_map(),
            Err(MapError::InvalidConfig(_))
        ));

        let inverted = MapOptions {
            min_zoom: 10,
            max_zoom: 4,
            ..Default::default()
        };
        assert!(Map::from_options(&inverted).is_err());

        let bounded = MapOptions {
            bounds: Some([10, 20, 30, 40]),
            tile_size: 512,
            ..Default::default()
        };
        let map = Map::from_options(&bounded).unwrap();
        assert_eq!(*map.bounds(), MapRect::new(10, 20, 30, 40));
        assert_eq!(map.tile_size_power(), 9);
    }

    #[test]
    fn test_from_metadata() {
        let metadata = TileSourceMetadata {
            bounds: Some([GeoPoint::new(-10.0, 40.0), GeoPoint::new(5.0, 50.0)]),
            min_zoom: 2,
            max_zoom: 12,
            ..Default::default()
        };
        let map = Map::from_metadata(&metadata).unwrap();
        assert_eq!(map.min_zoom(), 2);
        assert_eq!(map.max_zoom(), 12);

        let b = map.bounds();
        assert!(!b.wraps());
        assert!(b.min_y < b.max_y);
        assert!(b.contains_point(&GeoPoint::new(0.0, 45.0).to_map_point()));
        assert!(!b.contains_point(&GeoPoint::new(0.0, 30.0).to_map_point()));
    }
}
