use crate::{
    core::{
        constants::{WORLD_BITS, ZOOM_MULTIPLIER},
        geo::{Point, TileCoord},
        projection::Projection,
    },
    prelude::Arc,
    tiles::{loader::TileLoader, source::TileImage},
};
use log::trace;

/// One visible tile position and what the cache holds for it.
#[derive(Debug, Clone)]
pub struct PlannedTile {
    pub grid_x: i64,
    pub grid_y: i64,
    /// `(grid_x, grid_y)` wrapped into the pyramid.
    pub coord: TileCoord,
    /// Top-left corner in pre-transform pixel space.
    pub origin: Point,
    pub image: Option<Arc<TileImage>>,
    /// Quadrants from the next zoom level, in [`TileCoord::children`] order.
    /// Only consulted while between zoom levels or when `image` is missing.
    pub children: [Option<Arc<TileImage>>; 4],
    /// Alpha (0-256) for drawing `children` over `image`.
    pub overlay_alpha: u32,
}

/// Everything a renderer needs to draw the tile layer for one frame.
#[derive(Debug, Clone, Default)]
pub struct TilePlan {
    pub zoom: i32,
    pub tile_size: u32,
    pub tiles: Vec<PlannedTile>,
    /// Load requests issued while planning.
    pub requested: usize,
}

impl TilePlan {
    pub fn missing(&self) -> usize {
        self.tiles.iter().filter(|t| t.image.is_none()).count()
    }
}

/// Decides, per frame, which tiles to draw and which to load.
pub struct TileLayer {
    loader: Arc<TileLoader>,
}

impl TileLayer {
    pub fn new(loader: Arc<TileLoader>) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &Arc<TileLoader> {
        &self.loader
    }

    /// Builds the frame plan from a freshly projected view.
    ///
    /// Missing tiles are requested. While the zoom sits between two levels
    /// the next level's quadrants are looked up as a blended overlay, and
    /// missing quadrants are requested too; a missing tile also falls back to
    /// whatever quadrants are cached. If anything was requested,
    /// `invalidate` is queued to come back once the loader has drained.
    pub fn plan<F>(&self, projection: &Projection, invalidate: F) -> TilePlan
    where
        F: FnOnce() + Send + 'static,
    {
        let zoom = projection.zoom();
        let offset_points = projection.zoom_offset();
        let downscale = offset_points != 0;
        let range = projection.tile_range();

        let mut plan = TilePlan {
            zoom,
            tile_size: 1 << projection.tile_size_power(),
            tiles: Vec::with_capacity((range.columns() * range.rows()).max(0) as usize),
            requested: 0,
        };

        for (grid_x, grid_y, coord) in range.iter() {
            let image = self.loader.get_tile(&coord);
            let missing = image.is_none();
            if missing {
                self.loader.request_tile(coord, None);
                plan.requested += 1;
            }

            let mut children: [Option<Arc<TileImage>>; 4] = Default::default();
            let mut overlay_alpha = 255;
            // no level exists below the deepest one
            if (downscale || missing) && zoom < WORLD_BITS {
                if downscale && !missing {
                    overlay_alpha = offset_points as u32 * 256 / ZOOM_MULTIPLIER as u32;
                }
                for (slot, child) in children.iter_mut().zip(coord.children()) {
                    *slot = self.loader.get_tile(&child);
                    if slot.is_none() && downscale {
                        self.loader.request_tile(child, None);
                        plan.requested += 1;
                    }
                }
            }

            plan.tiles.push(PlannedTile {
                grid_x,
                grid_y,
                coord,
                origin: projection.tile_origin(grid_x, grid_y),
                image,
                children,
                overlay_alpha,
            });
        }

        if plan.requested > 0 {
            trace!("Planned {} tiles, {} requested", plan.tiles.len(), plan.requested);
            self.loader.notify_when_drained(Box::new(invalidate));
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::BASE;
    use crate::tiles::source::MemoryTileSource;
    use std::time::Duration;

    fn setup(zoom_points: i32) -> (TileLayer, Projection) {
        let loader = Arc::new(TileLoader::with_default_config());
        loader.set_tile_source(Some(Arc::new(MemoryTileSource::default())));

        let mut projection = Projection::new(500, 500);
        projection.set_zoom_points(zoom_points);
        projection.center_on(BASE / 2, BASE / 2);
        projection.project();
        (TileLayer::new(loader), projection)
    }

    fn wait_for_invalidate(layer: &TileLayer) {
        let callback = layer
            .loader()
            .callback_receiver()
            .recv_timeout(Duration::from_secs(5))
            .expect("no drain notification");
        callback();
    }

    #[test]
    fn test_whole_level_plan() {
        let (layer, projection) = setup(ZOOM_MULTIPLIER);

        let first = layer.plan(&projection, || {});
        assert_eq!(first.tiles.len(), 4);
        assert_eq!(first.missing(), 4);
        assert_eq!(first.requested, 4);
        assert_eq!(first.tile_size, 256);
        wait_for_invalidate(&layer);

        let second = layer.plan(&projection, || {});
        assert_eq!(second.missing(), 0);
        assert_eq!(second.requested, 0);
        assert!(second.tiles.iter().all(|t| t.overlay_alpha == 255));
        assert!(second.tiles.iter().all(|t| t.children.iter().all(Option::is_none)));
    }

    #[test]
    fn test_between_levels_requests_children() {
        let (layer, projection) = setup(ZOOM_MULTIPLIER + ZOOM_MULTIPLIER / 2);

        let first = layer.plan(&projection, || {});
        assert_eq!(first.tiles.len(), 4);
        assert_eq!(first.requested, 4 + 16);
        wait_for_invalidate(&layer);

        let second = layer.plan(&projection, || {});
        assert_eq!(second.requested, 0);
        for tile in &second.tiles {
            assert_eq!(tile.overlay_alpha, 128);
            assert!(tile.children.iter().all(Option::is_some));
        }
    }

    #[test]
    fn test_deepest_level_never_requests_children() {
        let (layer, projection) = setup(30 * ZOOM_MULTIPLIER + 5);
        assert_eq!(projection.zoom(), 30);

        let plan = layer.plan(&projection, || {});
        assert!(!plan.tiles.is_empty());
        assert!(plan.tiles.iter().all(|t| t.coord.z == 30));
        assert_eq!(plan.requested, plan.tiles.len());
        assert!(plan.tiles.iter().all(|t| t.children.iter().all(Option::is_none)));
    }

    #[test]
    fn test_tile_origins_step_by_tile_size() {
        let (layer, projection) = setup(ZOOM_MULTIPLIER);
        let plan = layer.plan(&projection, || {});
        let first = &plan.tiles[0];
        let second = &plan.tiles[1];
        assert_eq!(second.grid_x, first.grid_x + 1);
        assert!((second.origin.x - first.origin.x - 256.0).abs() < 1e-9);
    }
}
