//! Shared trait abstractions for common patterns

use crate::core::geo::{GeoPoint, MapPoint, Point};
use nalgebra::{Matrix3, Vector3};

/// Applies a 2D affine transform held in homogeneous 3x3 form.
pub trait MatrixTransform {
    fn apply_transform(&self, matrix: &Matrix3<f64>) -> Self;

    /// Builds `T(translate) * R(degrees) * S(scale)`, so points are scaled,
    /// then rotated, then translated.
    fn create_transform_matrix(translate: Point, degrees: f64, scale: f64) -> Matrix3<f64> {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Matrix3::new(
            cos * scale,
            -sin * scale,
            translate.x,
            sin * scale,
            cos * scale,
            translate.y,
            0.0,
            0.0,
            1.0,
        )
    }
}

impl MatrixTransform for Point {
    fn apply_transform(&self, matrix: &Matrix3<f64>) -> Self {
        let v = matrix * Vector3::new(self.x, self.y, 1.0);
        Point::new(v.x, v.y)
    }
}

/// Unified interpolation trait
pub trait Lerp {
    fn lerp(&self, other: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for Point {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        Point::new(self.x.lerp(&other.x, t), self.y.lerp(&other.y, t))
    }
}

impl Lerp for GeoPoint {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        GeoPoint::with_altitude(
            self.longitude.lerp(&other.longitude, t),
            self.latitude.lerp(&other.latitude, t),
            self.altitude.lerp(&other.altitude, t),
        )
    }
}

// Components are rounded to the nearest fixed-point unit; no wrapping.
impl Lerp for MapPoint {
    fn lerp(&self, other: &Self, t: f64) -> Self {
        let component = |a: i32, b: i32| (a as f64).lerp(&(b as f64), t).round() as i32;
        MapPoint::with_altitude(
            component(self.x, other.x),
            component(self.y, other.y),
            component(self.z, other.z),
        )
    }
}
