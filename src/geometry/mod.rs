//! Planar helpers over projected points: a fast distance estimate and
//! segment tools.

pub mod distance;
pub mod tools;

pub use distance::estimate as distance;
pub use tools::{closest_t_on_segment, interpolate};
