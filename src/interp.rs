use crate::{
    settings::EdgePlacement,
    types::{Point, Value},
};

// Return the interpolation factor t at which the segment v0..v1 reaches iso_val
pub fn find_t(v0: Value, v1: Value, iso_val: Value) -> Value {
    (iso_val - v0) / (v1 - v0)
}

// Linear interpolation
pub fn lerp(a: Value, b: Value, t: Value) -> Value {
    a + (b - a) * t
}

// Linearly interpolate between two points by factor t
pub fn interpolate_points(p0: &Point, p1: &Point, t: Value) -> Point {
    Point::new(lerp(p0.x, p1.x, t), lerp(p0.y, p1.y, t), lerp(p0.z, p1.z, t))
}

/// Parameter along the edge `v0..v1` where the crossing is placed.
///
/// [`EdgePlacement::Interpolated`] falls back to the midpoint when the corner values can't
/// be interpolated (non-finite, or equal).
#[inline]
pub fn crossing_t(v0: Value, v1: Value, placement: EdgePlacement) -> Value {
    match placement {
        EdgePlacement::Midpoint => 0.5,
        EdgePlacement::Interpolated => {
            let t = find_t(v0, v1, 0.0);
            if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolated_crossing_hits_the_root() {
        let t = crossing_t(-1.0, 3.0, EdgePlacement::Interpolated);
        assert_eq!(t, 0.25);
        let p = interpolate_points(&Point::new(0.0, 0.0, 0.0), &Point::new(4.0, 0.0, 0.0), t);
        assert_eq!(p, Point::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn midpoint_ignores_values() {
        assert_eq!(crossing_t(-1.0, 100.0, EdgePlacement::Midpoint), 0.5);
    }

    #[test]
    fn uninterpolable_edges_use_the_midpoint() {
        for (a, b) in [(1.0, 1.0), (-1.0, Value::NAN), (Value::INFINITY, -2.0)] {
            assert_eq!(crossing_t(a, b, EdgePlacement::Interpolated), 0.5);
        }
    }
}
