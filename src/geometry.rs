//! Small 2D helpers shared by the blockage analyzer, detour planner and grid

use bevy::prelude::*;

/// Axis-aligned bounding box in world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Box around a circle
    pub fn from_circle(center: Vec2, radius: f32) -> Self {
        let r = Vec2::splat(radius.max(0.0));
        Self::new(center - r, center + r)
    }

    pub fn union(self, other: Bounds) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn corners(self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }
}

/// Parameter in [0, 1] of the point on segment `a..b` closest to `point`
pub fn closest_param_on_segment(point: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return 0.0;
    }
    ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0)
}

pub fn closest_point_on_segment(point: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    a + (b - a) * closest_param_on_segment(point, a, b)
}

pub fn point_segment_distance(point: Vec2, a: Vec2, b: Vec2) -> f32 {
    point.distance(closest_point_on_segment(point, a, b))
}

/// Points every `step` units from `from` to `to`, both ends included
pub fn sample_segment(from: Vec2, to: Vec2, step: f32) -> Vec<Vec2> {
    let length = from.distance(to);
    let count = if step > 0.0 {
        (length / step).ceil().max(1.0) as usize
    } else {
        1
    };

    (0..=count)
        .map(|i| from.lerp(to, i as f32 / count as f32))
        .collect()
}

/// Component index (0 = x, 1 = y) with the larger absolute value
pub fn dominant_axis(v: Vec2) -> usize {
    if v.x.abs() >= v.y.abs() { 0 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_union_and_center() {
        let a = Bounds::from_circle(Vec2::new(0.0, 0.0), 10.0);
        let b = Bounds::from_circle(Vec2::new(30.0, 0.0), 10.0);
        let merged = a.union(b);

        assert_eq!(merged.min, Vec2::new(-10.0, -10.0));
        assert_eq!(merged.max, Vec2::new(40.0, 10.0));
        assert_eq!(merged.center(), Vec2::new(15.0, 0.0));
    }

    #[test]
    fn test_point_segment_distance() {
        let a = Vec2::ZERO;
        let b = Vec2::new(100.0, 0.0);

        assert_eq!(point_segment_distance(Vec2::new(50.0, 30.0), a, b), 30.0);
        // Beyond the end, distance is measured to the endpoint
        assert_eq!(point_segment_distance(Vec2::new(103.0, 4.0), a, b), 5.0);
        // Degenerate segment
        assert_eq!(point_segment_distance(Vec2::new(3.0, 4.0), a, a), 5.0);
    }

    #[test]
    fn test_sample_segment_includes_both_ends() {
        let samples = sample_segment(Vec2::ZERO, Vec2::new(500.0, 0.0), 50.0);
        assert_eq!(samples.len(), 11);
        assert_eq!(samples[0], Vec2::ZERO);
        assert_eq!(samples[5], Vec2::new(250.0, 0.0));
        assert_eq!(samples[10], Vec2::new(500.0, 0.0));
    }

    #[test]
    fn test_dominant_axis() {
        assert_eq!(dominant_axis(Vec2::new(500.0, 20.0)), 0);
        assert_eq!(dominant_axis(Vec2::new(-3.0, -400.0)), 1);
    }
}
