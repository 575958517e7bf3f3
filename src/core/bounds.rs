use crate::core::constants::{BASE, MASK};
use crate::core::geo::{GeoPoint, MapPoint};
use serde::{Deserialize, Serialize};

/// A rectangle in the fixed-point Mercator plane with x-axis wraparound.
///
/// Coordinates lie in `[0, MASK]`. When `min_x > max_x` the rectangle is the
/// union of `[min_x, MASK]` and `[0, max_x]`. `min_x == max_x` is the single
/// column `{min_x}`, never the complement band. The y axis does not wrap, so
/// `min_y <= max_y` always holds.
///
/// Every predicate has a free-function twin on raw integers further down in
/// this module; both share the same branch structure and must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl MapRect {
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The whole world, `[0, MASK] x [0, MASK]`.
    pub fn world() -> Self {
        Self::new(0, 0, MASK, MASK)
    }

    /// Builds a rectangle from geographic edges. West may be east of east,
    /// which produces a rectangle crossing the antimeridian.
    pub fn from_geo_bounds(west: f64, south: f64, east: f64, north: f64) -> Self {
        let north_west = GeoPoint::new(west, north).to_map_point();
        let south_east = GeoPoint::new(east, south).to_map_point();
        Self::new(north_west.x, north_west.y, south_east.x, south_east.y)
    }

    pub fn from_corners(min: &MapPoint, max: &MapPoint) -> Self {
        Self::new(min.x, min.y, max.x, max.y)
    }

    /// True when the x range crosses the 0/BASE seam.
    pub fn wraps(&self) -> bool {
        self.min_x > self.max_x
    }

    /// True for the non-wrapping rectangle spanning every column.
    pub fn is_full_width(&self) -> bool {
        self.min_x == 0 && self.max_x == MASK
    }

    pub fn min_point(&self) -> MapPoint {
        MapPoint::new(self.min_x, self.min_y)
    }

    pub fn max_point(&self) -> MapPoint {
        MapPoint::new(self.max_x, self.max_y)
    }

    /// Width in fixed-point units, counting both inclusive edges.
    pub fn width(&self) -> i64 {
        if self.wraps() {
            (BASE as i64 - self.min_x as i64) + self.max_x as i64 + 1
        } else {
            self.max_x as i64 - self.min_x as i64 + 1
        }
    }

    pub fn height(&self) -> i64 {
        self.max_y as i64 - self.min_y as i64 + 1
    }

    /// Center point, taken along the wrapped x range when the rectangle wraps.
    pub fn center(&self) -> MapPoint {
        let span_x = self.width() - 1;
        let x = ((self.min_x as i64 + span_x / 2) & MASK as i64) as i32;
        let y = ((self.min_y as i64 + self.max_y as i64) / 2) as i32;
        MapPoint::new(x, y)
    }

    /// The four corners: (min, min), (max, min), (min, max), (max, max).
    pub fn corners(&self) -> [MapPoint; 4] {
        [
            MapPoint::new(self.min_x, self.min_y),
            MapPoint::new(self.max_x, self.min_y),
            MapPoint::new(self.min_x, self.max_y),
            MapPoint::new(self.max_x, self.max_y),
        ]
    }

    /// Tests if this rectangle intersects another.
    pub fn intersects(&self, other: &MapRect) -> bool {
        rect_intersects(
            self.min_x,
            self.min_y,
            self.max_x,
            self.max_y,
            other.min_x,
            other.min_y,
            other.max_x,
            other.max_y,
        )
    }

    /// Tests if this rectangle contains a point.
    pub fn contains_point(&self, point: &MapPoint) -> bool {
        rect_contains_point(
            self.min_x, self.min_y, self.max_x, self.max_y, point.x, point.y,
        )
    }

    /// Tests if this rectangle contains another rectangle entirely.
    pub fn contains_rect(&self, other: &MapRect) -> bool {
        rect_contains_rect(
            self.min_x,
            self.min_y,
            self.max_x,
            self.max_y,
            other.min_x,
            other.min_y,
            other.max_x,
            other.max_y,
        )
    }
}

impl Default for MapRect {
    fn default() -> Self {
        Self::world()
    }
}

impl std::fmt::Display for MapRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {})-({}, {})",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// Tests if the first rectangle intersects the second.
#[allow(clippy::too_many_arguments)]
pub fn rect_intersects(
    first_min_x: i32,
    first_min_y: i32,
    first_max_x: i32,
    first_max_y: i32,
    second_min_x: i32,
    second_min_y: i32,
    second_max_x: i32,
    second_max_y: i32,
) -> bool {
    if first_max_y < second_min_y || first_min_y > second_max_y {
        return false;
    }

    let first_wraps = first_min_x > first_max_x;
    let second_wraps = second_min_x > second_max_x;

    match (first_wraps, second_wraps) {
        (false, false) => first_max_x >= second_min_x && first_min_x <= second_max_x,
        // a wrapping range covers [min, BASE) and [0, max]; the plain range
        // overlaps it when it reaches either piece
        (false, true) => first_max_x >= second_min_x || first_min_x <= second_max_x,
        (true, false) => second_max_x >= first_min_x || second_min_x <= first_max_x,
        // both ranges include the seam
        (true, true) => true,
    }
}

/// Tests if a rectangle contains a point.
pub fn rect_contains_point(
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
    point_x: i32,
    point_y: i32,
) -> bool {
    if point_y < min_y || point_y > max_y {
        return false;
    }

    if min_x <= max_x {
        point_x >= min_x && point_x <= max_x
    } else {
        point_x >= min_x || point_x <= max_x
    }
}

/// Tests if the first rectangle contains the second.
///
/// A wrapping inner rectangle is only contained by the full-width rectangle
/// (`min_x == 0`, `max_x == MASK`).
#[allow(clippy::too_many_arguments)]
pub fn rect_contains_rect(
    outer_min_x: i32,
    outer_min_y: i32,
    outer_max_x: i32,
    outer_max_y: i32,
    inner_min_x: i32,
    inner_min_y: i32,
    inner_max_x: i32,
    inner_max_y: i32,
) -> bool {
    if inner_min_y < outer_min_y || inner_max_y > outer_max_y {
        return false;
    }

    let outer_wraps = outer_min_x > outer_max_x;
    let inner_wraps = inner_min_x > inner_max_x;

    match (outer_wraps, inner_wraps) {
        (false, false) => inner_min_x >= outer_min_x && inner_max_x <= outer_max_x,
        (false, true) => outer_min_x == 0 && outer_max_x == MASK,
        // the plain inner range must sit inside one of the two pieces
        (true, false) => inner_min_x >= outer_min_x || inner_max_x <= outer_max_x,
        (true, true) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q: i32 = BASE / 4;

    fn plain() -> MapRect {
        MapRect::new(Q, Q, 2 * Q, 2 * Q)
    }

    fn seam() -> MapRect {
        // crosses x = 0
        MapRect::new(3 * Q, Q, Q / 2, 2 * Q)
    }

    fn all_pairs() -> Vec<(MapRect, MapRect)> {
        let rects = [
            plain(),
            seam(),
            MapRect::world(),
            MapRect::new(0, 0, 0, MASK),
            MapRect::new(MASK, 0, 0, MASK),
            MapRect::new(2 * Q + 1, 0, 3 * Q - 1, MASK),
            MapRect::new(Q / 2, 3 * Q, Q / 2, 3 * Q),
            MapRect::new(7 * Q / 2, 0, 3 * Q + 1, 10),
        ];
        let mut pairs = Vec::new();
        for a in rects.iter() {
            for b in rects.iter() {
                pairs.push((*a, *b));
            }
        }
        pairs
    }

    #[test]
    fn test_intersects_is_symmetric() {
        for (a, b) in all_pairs() {
            assert_eq!(a.intersects(&b), b.intersects(&a), "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_struct_and_raw_forms_agree() {
        for (a, b) in all_pairs() {
            assert_eq!(
                a.intersects(&b),
                rect_intersects(a.min_x, a.min_y, a.max_x, a.max_y, b.min_x, b.min_y, b.max_x, b.max_y)
            );
            assert_eq!(
                a.contains_rect(&b),
                rect_contains_rect(a.min_x, a.min_y, a.max_x, a.max_y, b.min_x, b.min_y, b.max_x, b.max_y)
            );
            let p = b.center();
            assert_eq!(
                a.contains_point(&p),
                rect_contains_point(a.min_x, a.min_y, a.max_x, a.max_y, p.x, p.y)
            );
        }
    }

    #[test]
    fn test_intersects_plain_plain() {
        assert!(plain().intersects(&MapRect::new(2 * Q, 2 * Q, 3 * Q, 3 * Q)));
        assert!(!plain().intersects(&MapRect::new(2 * Q + 1, Q, 3 * Q, 2 * Q)));
    }

    #[test]
    fn test_intersects_plain_wrapping() {
        let near_zero = MapRect::new(10, Q, 20, 2 * Q);
        let near_end = MapRect::new(MASK - 20, Q, MASK - 10, 2 * Q);
        let middle = MapRect::new(Q, Q, 2 * Q, 2 * Q);

        assert!(near_zero.intersects(&seam()));
        assert!(near_end.intersects(&seam()));
        assert!(!middle.intersects(&seam()));

        assert!(seam().intersects(&near_zero));
        assert!(seam().intersects(&near_end));
        assert!(!seam().intersects(&middle));
    }

    #[test]
    fn test_intersects_wrapping_wrapping() {
        let other = MapRect::new(MASK - 5, Q, 5, 2 * Q);
        assert!(seam().intersects(&other));
        let other_rows = MapRect::new(MASK - 5, 3 * Q, 5, MASK);
        assert!(!seam().intersects(&other_rows));
    }

    #[test]
    fn test_y_is_checked_first() {
        let below = MapRect::new(0, 2 * Q + 1, MASK, MASK);
        assert!(!plain().intersects(&below));
        assert!(!seam().intersects(&below));
        assert!(!MapRect::world().contains_rect(&MapRect::new(0, -1, 5, 5)));
    }

    #[test]
    fn test_contains_corners_and_center() {
        for r in [plain(), seam(), MapRect::world(), MapRect::new(5, 5, 5, 5)] {
            for corner in r.corners() {
                assert!(r.contains_point(&corner), "{} corner {:?}", r, corner);
            }
            assert!(r.contains_point(&r.center()), "{} center", r);
        }
    }

    #[test]
    fn test_single_column_is_not_the_complement() {
        let column = MapRect::new(Q, 0, Q, MASK);
        assert!(!column.wraps());
        assert!(column.contains_point(&MapPoint::new(Q, 10)));
        assert!(!column.contains_point(&MapPoint::new(Q + 1, 10)));
        assert!(!column.contains_point(&MapPoint::new(Q - 1, 10)));
        assert!(!column.intersects(&MapRect::new(0, 0, Q - 1, MASK)));
        assert_eq!(column.width(), 1);
    }

    #[test]
    fn test_contains_point_wrapping() {
        assert!(seam().contains_point(&MapPoint::new(0, Q)));
        assert!(seam().contains_point(&MapPoint::new(MASK, Q)));
        assert!(!seam().contains_point(&MapPoint::new(2 * Q, Q)));
    }

    #[test]
    fn test_contains_rect_plain_plain() {
        assert!(plain().contains_rect(&MapRect::new(Q + 1, Q + 1, 2 * Q - 1, 2 * Q - 1)));
        assert!(!plain().contains_rect(&MapRect::new(Q - 1, Q + 1, 2 * Q - 1, 2 * Q - 1)));
    }

    #[test]
    fn test_contains_rect_plain_outer_wrapping_inner() {
        let inner = MapRect::new(MASK - 5, Q, 5, Q + 5);
        assert!(MapRect::world().contains_rect(&inner));
        assert!(!MapRect::new(0, 0, MASK - 1, MASK).contains_rect(&inner));
        assert!(!MapRect::new(1, 0, MASK, MASK).contains_rect(&inner));
    }

    #[test]
    fn test_contains_rect_wrapping_outer_plain_inner() {
        assert!(seam().contains_rect(&MapRect::new(3 * Q + 1, Q, MASK, 2 * Q)));
        assert!(seam().contains_rect(&MapRect::new(0, Q, Q / 2, 2 * Q)));
        assert!(!seam().contains_rect(&MapRect::new(Q, Q, Q + 1, 2 * Q)));
    }

    #[test]
    fn test_contains_rect_wrapping_outer_wrapping_inner() {
        let inner = MapRect::new(MASK - 5, Q, 5, Q + 5);
        assert!(!seam().contains_rect(&inner));
        assert!(!seam().contains_rect(&seam()));
    }

    #[test]
    fn test_from_geo_bounds_crossing_antimeridian() {
        let r = MapRect::from_geo_bounds(170.0, -10.0, -170.0, 10.0);
        assert!(r.wraps());
        assert!(r.contains_point(&GeoPoint::new(179.0, 0.0).to_map_point()));
        assert!(r.contains_point(&GeoPoint::new(-179.0, 0.0).to_map_point()));
        assert!(!r.contains_point(&GeoPoint::new(0.0, 0.0).to_map_point()));
    }
}
