use crate::{
    core::{
        bounds::MapRect,
        constants::{BASE, MASK, TILE_SIZE_POWER, WORLD_BITS, ZOOM_MULTIPLIER},
        geo::{MapPoint, Point, TileCoord},
        map::Map,
    },
    traits::MatrixTransform,
};
use log::warn;
use nalgebra::Matrix3;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// `2^(i / ZOOM_MULTIPLIER)` for every sub-level step.
static ZOOM_SCALES: Lazy<[f64; ZOOM_MULTIPLIER as usize]> = Lazy::new(|| {
    let mut scales = [1.0; ZOOM_MULTIPLIER as usize];
    for (i, scale) in scales.iter_mut().enumerate() {
        *scale = 2f64.powf(i as f64 / ZOOM_MULTIPLIER as f64);
    }
    scales
});

const MAX_ZOOM_POINTS: i32 = WORLD_BITS * ZOOM_MULTIPLIER;

/// Saved projection state, restorable with [`Projection::restore_viewpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    pub pixel_focus: Point,
    pub map_focus_x: i32,
    pub map_focus_y: i32,
    pub rotation: f64,
    pub zoom_points: i32,
}

/// Unmasked clip extents in fixed-point units. Values may fall outside
/// `[0, BASE)` when the view crosses the seam or extends past the poles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawClip {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

/// Inclusive range of tile grid positions covering the view at one zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub start_x: i64,
    pub start_y: i64,
    pub end_x: i64,
    pub end_y: i64,
}

impl TileRange {
    pub fn columns(&self) -> i64 {
        self.end_x - self.start_x + 1
    }

    pub fn rows(&self) -> i64 {
        self.end_y - self.start_y + 1
    }

    /// Grid positions row by row, each paired with its wrapped tile.
    pub fn iter(&self) -> impl Iterator<Item = (i64, i64, TileCoord)> {
        let range = *self;
        (range.start_y..=range.end_y).flat_map(move |grid_y| {
            (range.start_x..=range.end_x)
                .map(move |grid_x| (grid_x, grid_y, TileCoord::wrapped(grid_x, grid_y, range.zoom)))
        })
    }
}

/// Pan/zoom/rotation state of a view and the values derived from it.
///
/// Mutators only touch the primary state. The derived fields (zoom level,
/// shifts, clip rectangle, transforms) are stale until [`Projection::project`]
/// is called. The two focus operations are the exception: they re-anchor the
/// transform without moving the view, so they refresh the matrices as well.
///
/// A projection has a single owner; share it across threads behind a lock
/// that covers mutation and `project()` together.
#[derive(Debug, Clone)]
pub struct Projection {
    pixel_focus: Point,
    map_focus_x: i32,
    map_focus_y: i32,
    rotation: f64,
    zoom_points: i32,
    width: i32,
    height: i32,
    map: Option<Map>,

    zoom: i32,
    zoom_offset: i32,
    zoom_scale: f64,
    tile_count: i64,
    tile_shift: i32,
    pixel_shift: i32,
    tile_size_power: i32,
    raw_clip: RawClip,
    clip: MapRect,
    transform: Matrix3<f64>,
    inverse: Matrix3<f64>,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            pixel_focus: Point::default(),
            map_focus_x: 0,
            map_focus_y: 0,
            rotation: 0.0,
            zoom_points: 0,
            width: 1,
            height: 1,
            map: None,
            zoom: 0,
            zoom_offset: 0,
            zoom_scale: 1.0,
            tile_count: 1,
            tile_shift: WORLD_BITS,
            pixel_shift: WORLD_BITS - TILE_SIZE_POWER,
            tile_size_power: TILE_SIZE_POWER,
            raw_clip: RawClip::default(),
            clip: MapRect::new(0, 0, 0, 0),
            transform: Matrix3::identity(),
            inverse: Matrix3::identity(),
        }
    }
}

impl Projection {
    pub fn new(width: i32, height: i32) -> Self {
        let mut projection = Self::default();
        projection.set_size(width, height);
        projection
    }

    pub fn with_map(mut self, map: Map) -> Self {
        self.set_map(Some(map));
        self
    }

    /// Recomputes every derived field from the current state.
    pub fn project(&mut self) {
        let points = self.zoom_points.clamp(0, MAX_ZOOM_POINTS);
        self.zoom = points / ZOOM_MULTIPLIER;
        self.zoom_offset = points % ZOOM_MULTIPLIER;
        self.zoom_scale = ZOOM_SCALES[self.zoom_offset as usize];
        self.tile_count = 1_i64 << self.zoom;
        self.tile_size_power = self
            .map
            .as_ref()
            .map_or(TILE_SIZE_POWER, Map::tile_size_power);
        self.tile_shift = WORLD_BITS - self.zoom;
        self.pixel_shift = self.tile_shift - self.tile_size_power;

        self.update_transform();

        let (w, h) = (self.width as f64, self.height as f64);
        let corners = [
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(0.0, h),
            Point::new(w, h),
        ]
        .map(|corner| corner.apply_transform(&self.inverse));

        let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

        let unit = self.pixel_unit();
        self.raw_clip = RawClip {
            min_x: (min_x.floor() * unit) as i64 + self.map_focus_x as i64,
            min_y: (min_y.floor() * unit) as i64 + self.map_focus_y as i64,
            max_x: (max_x.ceil() * unit) as i64 + self.map_focus_x as i64,
            max_y: (max_y.ceil() * unit) as i64 + self.map_focus_y as i64,
        };

        let raw = &self.raw_clip;
        let (clip_min_x, clip_max_x) = if raw.max_x - raw.min_x >= BASE as i64 {
            (0, MASK)
        } else {
            ((raw.min_x & MASK as i64) as i32, (raw.max_x & MASK as i64) as i32)
        };
        self.clip = MapRect::new(
            clip_min_x,
            raw.min_y.clamp(0, MASK as i64) as i32,
            clip_max_x,
            raw.max_y.clamp(0, MASK as i64) as i32,
        );
    }

    fn update_transform(&mut self) {
        self.transform =
            Point::create_transform_matrix(self.pixel_focus, self.rotation, self.zoom_scale);
        self.inverse = self.transform.try_inverse().unwrap_or_else(|| {
            warn!("Projection transform is singular, using identity inverse");
            Matrix3::identity()
        });
    }

    /// Fixed-point units per unscaled pixel at the current zoom level.
    fn pixel_unit(&self) -> f64 {
        2f64.powi(self.pixel_shift)
    }

    /// Signed distance from `from` to `to` along the x axis, in
    /// `[-BASE/2, BASE/2)`.
    fn wrapped_delta(to: i32, from: i32) -> i64 {
        let half = (BASE / 2) as i64;
        (to as i64 - from as i64 + half).rem_euclid(BASE as i64) - half
    }

    /// Keeps the map point under pixel `(x, y)` fixed and makes it the focus.
    pub fn focus_on_pixel(&mut self, x: f64, y: f64) {
        let offset = Point::new(x, y).apply_transform(&self.inverse);
        let unit = self.pixel_unit();

        self.map_focus_x = (self.map_focus_x as i64 + (offset.x * unit).round() as i64) as i32 & MASK;
        self.map_focus_y = (self.map_focus_y as i64 + (offset.y * unit).round() as i64) as i32 & MASK;
        self.pixel_focus = Point::new(x, y);
        self.update_transform();
    }

    /// Makes a map point the focus, keeping it at its current pixel.
    pub fn focus_on_point(&mut self, map_x: i32, map_y: i32) {
        self.pixel_focus = self.to_pixel(map_x, map_y);
        self.map_focus_x = map_x & MASK;
        self.map_focus_y = map_y & MASK;
        self.update_transform();
    }

    /// Puts a map point at the center of the view. Call `project()` after.
    pub fn center_on(&mut self, map_x: i32, map_y: i32) {
        self.pixel_focus = Point::new(self.width as f64 / 2.0, self.height as f64 / 2.0);
        self.map_focus_x = map_x & MASK;
        self.map_focus_y = map_y & MASK;
    }

    /// Pixel position of a map point. Only x wraps, so the nearest copy of
    /// the point east or west of the focus is used.
    pub fn to_pixel(&self, map_x: i32, map_y: i32) -> Point {
        let unit = self.pixel_unit();
        let dx = Self::wrapped_delta(map_x, self.map_focus_x) as f64 / unit;
        let dy = (map_y as i64 - self.map_focus_y as i64) as f64 / unit;
        Point::new(dx, dy).apply_transform(&self.transform)
    }

    /// Map point under a pixel, masked into `[0, MASK]`.
    pub fn to_map_point(&self, pixel_x: f64, pixel_y: f64) -> MapPoint {
        let offset = Point::new(pixel_x, pixel_y).apply_transform(&self.inverse);
        let unit = self.pixel_unit();
        MapPoint::new(
            (self.map_focus_x as i64 + (offset.x * unit).round() as i64) as i32 & MASK,
            (self.map_focus_y as i64 + (offset.y * unit).round() as i64) as i32 & MASK,
        )
    }

    /// True when any clip corner lies inside the map bounds. Without an
    /// attached map everything overlaps.
    pub fn overlaps_with_bounds(&self) -> bool {
        match &self.map {
            Some(map) => self
                .clip
                .corners()
                .iter()
                .any(|corner| map.bounds().contains_point(corner)),
            None => true,
        }
    }

    /// Tiles covering the raw clip extents at the current zoom.
    pub fn tile_range(&self) -> TileRange {
        let raw = &self.raw_clip;
        TileRange {
            zoom: self.zoom as u8,
            start_x: raw.min_x >> self.tile_shift,
            start_y: raw.min_y >> self.tile_shift,
            end_x: raw.max_x >> self.tile_shift,
            end_y: raw.max_y >> self.tile_shift,
        }
    }

    /// Position of a tile's top-left corner in unscaled, unrotated pixel
    /// space relative to the focus; apply [`Projection::transform`] to reach
    /// the screen.
    pub fn tile_origin(&self, grid_x: i64, grid_y: i64) -> Point {
        let tile_pixels = (1_i64 << self.tile_size_power) as f64;
        let unit = self.pixel_unit();
        Point::new(
            grid_x as f64 * tile_pixels - self.map_focus_x as f64 / unit,
            grid_y as f64 * tile_pixels - self.map_focus_y as f64 / unit,
        )
    }

    pub fn save_viewpoint(&self) -> Viewpoint {
        Viewpoint {
            pixel_focus: self.pixel_focus,
            map_focus_x: self.map_focus_x,
            map_focus_y: self.map_focus_y,
            rotation: self.rotation,
            zoom_points: self.zoom_points,
        }
    }

    /// Restores saved state, applying the current zoom clamp. Call
    /// `project()` after.
    pub fn restore_viewpoint(&mut self, viewpoint: &Viewpoint) {
        self.pixel_focus = viewpoint.pixel_focus;
        self.map_focus_x = viewpoint.map_focus_x & MASK;
        self.map_focus_y = viewpoint.map_focus_y & MASK;
        self.set_rotation(viewpoint.rotation);
        self.set_zoom_points(viewpoint.zoom_points);
    }

    pub fn set_pixel_focus(&mut self, focus: Point) {
        self.pixel_focus = focus;
    }

    pub fn pixel_focus(&self) -> Point {
        self.pixel_focus
    }

    pub fn set_map_focus(&mut self, map_x: i32, map_y: i32) {
        self.map_focus_x = map_x & MASK;
        self.map_focus_y = map_y & MASK;
    }

    pub fn map_focus(&self) -> MapPoint {
        MapPoint::new(self.map_focus_x, self.map_focus_y)
    }

    /// Rotation in degrees, stored modulo 360.
    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation = degrees % 360.0;
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Sets the continuous zoom, clamped to the attached map's zoom range.
    pub fn set_zoom_points(&mut self, zoom_points: i32) {
        self.zoom_points = match &self.map {
            Some(map) => zoom_points.clamp(
                map.min_zoom() * ZOOM_MULTIPLIER,
                map.max_zoom() * ZOOM_MULTIPLIER,
            ),
            None => zoom_points,
        };
    }

    pub fn zoom_points(&self) -> i32 {
        self.zoom_points
    }

    pub fn set_size(&mut self, width: i32, height: i32) {
        self.width = width;
        self.height = height;
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Attaches or detaches the map. The zoom is re-clamped to the new range.
    pub fn set_map(&mut self, map: Option<Map>) {
        self.map = map;
        self.set_zoom_points(self.zoom_points);
    }

    pub fn map(&self) -> Option<&Map> {
        self.map.as_ref()
    }

    pub fn zoom(&self) -> i32 {
        self.zoom
    }

    /// Sub-level zoom steps past [`Projection::zoom`], in
    /// `[0, ZOOM_MULTIPLIER)`.
    pub fn zoom_offset(&self) -> i32 {
        self.zoom_offset
    }

    pub fn zoom_scale(&self) -> f64 {
        self.zoom_scale
    }

    pub fn tile_count(&self) -> i64 {
        self.tile_count
    }

    pub fn tile_shift(&self) -> i32 {
        self.tile_shift
    }

    pub fn pixel_shift(&self) -> i32 {
        self.pixel_shift
    }

    pub fn tile_size_power(&self) -> i32 {
        self.tile_size_power
    }

    pub fn raw_clip(&self) -> &RawClip {
        &self.raw_clip
    }

    /// The masked clip rectangle; x may wrap.
    pub fn clip(&self) -> &MapRect {
        &self.clip
    }

    pub fn transform(&self) -> &Matrix3<f64> {
        &self.transform
    }

    pub fn inverse(&self) -> &Matrix3<f64> {
        &self.inverse
    }
}
