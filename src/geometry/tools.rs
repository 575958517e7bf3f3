use crate::{
    core::geo::{to_map_double, MapPoint},
    traits::Lerp,
};

/// Parameter `t` of the point on line AB closest to P.
///
/// `t` is in `[0, 1]` when the foot of the perpendicular falls on the segment
/// and outside that range otherwise; callers clamp if they need a point on
/// the segment. A degenerate segment gives `0.0`.
pub fn closest_t_on_segment(p: &MapPoint, a: &MapPoint, b: &MapPoint) -> f64 {
    let (px, py) = (to_map_double(p.x), to_map_double(p.y));
    let (ax, ay) = (to_map_double(a.x), to_map_double(a.y));
    let (bx, by) = (to_map_double(b.x), to_map_double(b.y));

    let (ap_x, ap_y) = (px - ax, py - ay);
    let (ab_x, ab_y) = (bx - ax, by - ay);

    let length_squared = ab_x * ab_x + ab_y * ab_y;
    if length_squared == 0.0 {
        return 0.0;
    }
    (ap_x * ab_x + ap_y * ab_y) / length_squared
}

/// Point at `t` along P1 -> P2, each component rounded (altitude included).
pub fn interpolate(p1: &MapPoint, p2: &MapPoint, t: f64) -> MapPoint {
    p1.lerp(p2, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_t() {
        let a = MapPoint::new(0, 0);
        let b = MapPoint::new(1000, 0);
        assert_eq!(closest_t_on_segment(&MapPoint::new(250, 40), &a, &b), 0.25);
        assert_eq!(closest_t_on_segment(&MapPoint::new(2000, 0), &a, &b), 2.0);
        assert!(closest_t_on_segment(&MapPoint::new(-500, 7), &a, &b) < 0.0);
    }

    #[test]
    fn test_degenerate_segment() {
        let a = MapPoint::new(10, 10);
        assert_eq!(closest_t_on_segment(&MapPoint::new(50, 50), &a, &a), 0.0);
    }

    #[test]
    fn test_interpolate_endpoints_and_midpoint() {
        let a = MapPoint::with_altitude(100, 200, 1000);
        let b = MapPoint::with_altitude(300, 100, 3000);
        assert_eq!(interpolate(&a, &b, 0.0), a);
        assert_eq!(interpolate(&a, &b, 1.0), b);
        assert_eq!(interpolate(&a, &b, 0.5), MapPoint::with_altitude(200, 150, 2000));
    }
}
