//! Overlap primitives for trigger zones and hazard colliders
//!
//! Everything is axis-aligned in screen space (y grows downward).

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Circular region (trigger zones)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Inclusive containment test
    pub fn contains(&self, point: Vec2) -> bool {
        self.radius > 0.0 && self.center.distance_squared(point) <= self.radius * self.radius
    }
}

/// Axis-aligned box (physics bodies)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    /// Box of `size` centered on `center`
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Box of `size` standing on `anchor` (origin at bottom-center)
    pub fn from_bottom_center(anchor: Vec2, size: Vec2) -> Self {
        Self {
            min: Vec2::new(anchor.x - size.x * 0.5, anchor.y - size.y),
            max: Vec2::new(anchor.x + size.x * 0.5, anchor.y),
        }
    }

    /// Strict overlap; touching edges do not count
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

/// World rectangle anchored at the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn mid_x(&self) -> f32 {
        self.width * 0.5
    }

    /// Clamp a body of `size` (centered on `pos`) so it stays inside the bounds
    pub fn clamp_body(&self, pos: Vec2, size: Vec2) -> Vec2 {
        let half = (size * 0.5).min(self.size() * 0.5);
        pos.clamp(half, self.size() - half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_contains_edge() {
        let zone = Circle::new(Vec2::new(100.0, 100.0), 80.0);
        assert!(zone.contains(Vec2::new(180.0, 100.0)));
        assert!(!zone.contains(Vec2::new(180.1, 100.0)));
        assert!(!Circle::new(Vec2::ZERO, 0.0).contains(Vec2::ZERO));
    }

    #[test]
    fn test_car_overlaps_cat_on_same_street() {
        // Cat standing on (300, 400), car driving along y = 400
        let cat = Aabb::from_bottom_center(Vec2::new(300.0, 400.0), Vec2::splat(32.0));
        let far = Aabb::from_center(Vec2::new(200.0, 400.0), Vec2::new(40.0, 18.0));
        let near = Aabb::from_center(Vec2::new(290.0, 400.0), Vec2::new(40.0, 18.0));
        assert!(!far.overlaps(&cat));
        assert!(near.overlaps(&cat));
        assert!(cat.overlaps(&near));
    }

    #[test]
    fn test_touching_boxes_do_not_overlap() {
        let a = Aabb::from_center(Vec2::ZERO, Vec2::splat(10.0));
        let b = Aabb::from_center(Vec2::new(10.0, 0.0), Vec2::splat(10.0));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_clamp_body() {
        let bounds = Bounds::new(800.0, 600.0);
        let size = Vec2::new(28.0, 32.0);
        assert_eq!(bounds.clamp_body(Vec2::new(-50.0, 700.0), size), Vec2::new(14.0, 584.0));
        assert_eq!(bounds.clamp_body(Vec2::new(400.0, 300.0), size), Vec2::new(400.0, 300.0));
    }
}
