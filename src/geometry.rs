//! Planar geometry helpers
//!
//! All rules operate on normalized image coordinates, where y grows downwards.

use serde::{Deserialize, Serialize};

/// Rays shorter than this are treated as having no direction
pub const DEGENERATE_EPSILON: f64 = 1e-9;

/// A 2D point in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Midpoint of two points
    pub fn midpoint(a: Point, b: Point) -> Point {
        Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
    }

    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Interior angle at `b` formed by the rays b->a and b->c, in degrees.
///
/// Computed as the absolute difference of the two ray headings, folded into
/// `[0, 180]`. Returns `None` when either ray has (near) zero length, since the
/// angle is undefined there.
pub fn joint_angle(a: Point, b: Point, c: Point) -> Option<f64> {
    if a.distance(b) < DEGENERATE_EPSILON || c.distance(b) < DEGENERATE_EPSILON {
        return None;
    }

    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let mut angle = radians.to_degrees().abs();
    if angle > 180.0 {
        angle = 360.0 - angle;
    }
    Some(angle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_right_angle() {
        let angle = joint_angle(p(0.0, 1.0), p(0.0, 0.0), p(1.0, 0.0)).unwrap();
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_collinear_extremes() {
        let straight = joint_angle(p(-1.0, 0.0), p(0.0, 0.0), p(1.0, 0.0)).unwrap();
        assert!((straight - 180.0).abs() < 1e-9);

        let folded = joint_angle(p(1.0, 0.0), p(0.0, 0.0), p(2.0, 0.0)).unwrap();
        assert!(folded.abs() < 1e-9);
    }

    #[test]
    fn test_symmetric_in_outer_points() {
        let a = p(0.3, 0.7);
        let b = p(0.5, 0.5);
        let c = p(0.9, 0.45);
        let forward = joint_angle(a, b, c).unwrap();
        let backward = joint_angle(c, b, a).unwrap();
        assert!((forward - backward).abs() < 1e-9);
    }

    #[test]
    fn test_reflex_angles_fold() {
        // Headings of -170 and +170 degrees differ by 340, which folds to 20
        let a = p(-1.0, -0.176);
        let c = p(-1.0, 0.176);
        let angle = joint_angle(a, p(0.0, 0.0), c).unwrap();
        assert!(angle <= 180.0);
        assert!((angle - 19.96).abs() < 0.1);
    }

    #[test]
    fn test_range_over_grid() {
        let b = p(0.5, 0.5);
        for i in 0..10 {
            for j in 0..10 {
                let a = p(i as f64 / 10.0, 0.05 + j as f64 / 11.0);
                let c = p(1.0 - j as f64 / 10.0, i as f64 / 9.0);
                if let Some(angle) = joint_angle(a, b, c) {
                    assert!((0.0..=180.0).contains(&angle));
                }
            }
        }
    }

    #[test]
    fn test_degenerate_rays() {
        assert!(joint_angle(p(0.5, 0.5), p(0.5, 0.5), p(1.0, 0.0)).is_none());
        assert!(joint_angle(p(0.0, 0.0), p(0.5, 0.5), p(0.5, 0.5)).is_none());
    }

    #[test]
    fn test_midpoint() {
        assert_eq!(Point::midpoint(p(0.0, 0.2), p(1.0, 0.4)), p(0.5, 0.30000000000000004));
    }
}
