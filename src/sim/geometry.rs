//! Geometry primitives
//!
//! Axis-aligned boxes, circles and convex polygons in world space (+y down).
//! Polygons store their vertices relative to their own origin and keep a
//! cached world-space copy that is rebuilt whenever the transform changes, so
//! collision queries always see an up-to-date bounding box.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Box from a top-left corner and a size
    pub fn from_rect(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + width, y + height),
        }
    }

    /// Box whose bottom edge is centred on `foot`
    pub fn from_foot(foot: Vec2, width: f32, height: f32) -> Self {
        Self::from_rect(foot.x - width / 2.0, foot.y - height, width, height)
    }

    /// Smallest box containing every point (empty input yields a zero box)
    pub fn from_points(points: &[Vec2]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        let (min, max) = points
            .iter()
            .skip(1)
            .fold((*first, *first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        Self { min, max }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn left(&self) -> f32 {
        self.min.x
    }

    pub fn right(&self) -> f32 {
        self.max.x
    }

    pub fn top(&self) -> f32 {
        self.min.y
    }

    pub fn bottom(&self) -> f32 {
        self.max.y
    }

    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Inclusive overlap test (touching boxes overlap)
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// Half-open containment: `min <= p < max`
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    /// Signed per-axis depth that pushes `self` out of `other`.
    ///
    /// Returns zero when the boxes do not strictly overlap.
    pub fn intersection_depth(&self, other: &Aabb) -> Vec2 {
        let half_a = self.size() * 0.5;
        let half_b = other.size() * 0.5;
        let dist = self.center() - other.center();
        let min_dist = half_a + half_b;

        if dist.x.abs() >= min_dist.x || dist.y.abs() >= min_dist.y {
            return Vec2::ZERO;
        }

        let depth_x = if dist.x > 0.0 {
            min_dist.x - dist.x
        } else {
            -min_dist.x - dist.x
        };
        let depth_y = if dist.y > 0.0 {
            min_dist.y - dist.y
        } else {
            -min_dist.y - dist.y
        };
        Vec2::new(depth_x, depth_y)
    }
}

/// A circle in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn bounding_box(&self) -> Aabb {
        let r = Vec2::splat(self.radius);
        Aabb::new(self.center - r, self.center + r)
    }
}

/// A convex polygon with a position, orientation and mirror flag.
///
/// The flag mirrors the relative vertices across the local vertical axis
/// before rotation, so one hull serves both facings.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    local: Vec<Vec2>,
    position: Vec2,
    orientation: f32,
    flipped: bool,
    world: Vec<Vec2>,
    edges: Vec<Vec2>,
    bounds: Aabb,
}

impl Polygon {
    /// Build a polygon from vertices relative to its origin.
    ///
    /// # Panics
    ///
    /// Panics if fewer than two vertices are supplied. Hulls coming from
    /// external data are validated before they reach this constructor.
    pub fn new(vertices: Vec<Vec2>) -> Self {
        assert!(
            vertices.len() >= 2,
            "polygon needs at least 2 vertices, got {}",
            vertices.len()
        );
        let mut poly = Self {
            world: Vec::with_capacity(vertices.len()),
            edges: Vec::with_capacity(vertices.len()),
            local: vertices,
            position: Vec2::ZERO,
            orientation: 0.0,
            flipped: false,
            bounds: Aabb::default(),
        };
        poly.refresh();
        poly
    }

    /// Rectangle centred on its origin
    pub fn rectangle(width: f32, height: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self::new(vec![
            Vec2::new(-hw, -hh),
            Vec2::new(hw, -hh),
            Vec2::new(hw, hh),
            Vec2::new(-hw, hh),
        ])
    }

    /// Rectangle covering `rect`, positioned at its centre
    pub fn from_aabb(rect: &Aabb) -> Self {
        let mut poly = Self::rectangle(rect.width(), rect.height());
        poly.set_position(rect.center());
        poly
    }

    /// Regular polygon with `sides` vertices on a circle of `radius`
    pub fn regular(sides: usize, radius: f32) -> Self {
        let sides = sides.max(3);
        let step = std::f32::consts::TAU / sides as f32;
        Self::new(
            (0..sides)
                .map(|i| Vec2::from_angle(step * i as f32) * radius)
                .collect(),
        )
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn orientation(&self) -> f32 {
        self.orientation
    }

    pub fn flipped(&self) -> bool {
        self.flipped
    }

    pub fn set_position(&mut self, position: Vec2) {
        if self.position != position {
            self.position = position;
            self.refresh();
        }
    }

    pub fn set_orientation(&mut self, orientation: f32) {
        if self.orientation != orientation {
            self.orientation = orientation;
            self.refresh();
        }
    }

    pub fn set_flipped(&mut self, flipped: bool) {
        if self.flipped != flipped {
            self.flipped = flipped;
            self.refresh();
        }
    }

    /// Set the whole transform with a single refresh
    pub fn set_transform(&mut self, position: Vec2, orientation: f32, flipped: bool) {
        self.position = position;
        self.orientation = orientation;
        self.flipped = flipped;
        self.refresh();
    }

    /// World-space vertices
    pub fn vertices(&self) -> &[Vec2] {
        &self.world
    }

    /// Vertices relative to the polygon origin (unflipped, unrotated)
    pub fn local_vertices(&self) -> &[Vec2] {
        &self.local
    }

    /// World-space edge vectors, `v[i + 1] - v[i]` wrapping at the end
    pub fn edges(&self) -> &[Vec2] {
        &self.edges
    }

    pub fn bounding_box(&self) -> Aabb {
        self.bounds
    }

    pub fn center(&self) -> Vec2 {
        self.bounds.center()
    }

    /// Rough radius: a quarter of the local width plus height
    pub fn radius(&self) -> f32 {
        let extents = Aabb::from_points(&self.local);
        (extents.width() + extents.height()) / 4.0
    }

    /// Map a local point through flip, rotation and translation
    pub fn transform_point(&self, local: Vec2) -> Vec2 {
        let local = if self.flipped {
            Vec2::new(-local.x, local.y)
        } else {
            local
        };
        Vec2::from_angle(self.orientation).rotate(local) + self.position
    }

    fn refresh(&mut self) {
        let rot = Vec2::from_angle(self.orientation);
        let flip = if self.flipped { -1.0 } else { 1.0 };

        self.world.clear();
        self.world.extend(
            self.local
                .iter()
                .map(|v| rot.rotate(Vec2::new(v.x * flip, v.y)) + self.position),
        );

        let n = self.world.len();
        self.edges.clear();
        self.edges
            .extend((0..n).map(|i| self.world[(i + 1) % n] - self.world[i]));

        self.bounds = Aabb::from_points(&self.world);
    }
}

/// Collision shape of an entity
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle(Circle),
    Polygon(Polygon),
}

impl Shape {
    pub fn position(&self) -> Vec2 {
        match self {
            Shape::Circle(c) => c.center,
            Shape::Polygon(p) => p.position(),
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        match self {
            Shape::Circle(c) => c.bounding_box(),
            Shape::Polygon(p) => p.bounding_box(),
        }
    }
}

/// Anything with a world-space bounding box
pub trait Bounded {
    fn bounding_box(&self) -> Aabb;
}

impl Bounded for Aabb {
    fn bounding_box(&self) -> Aabb {
        *self
    }
}

impl Bounded for Circle {
    fn bounding_box(&self) -> Aabb {
        Circle::bounding_box(self)
    }
}

impl Bounded for Polygon {
    fn bounding_box(&self) -> Aabb {
        self.bounds
    }
}

impl Bounded for Shape {
    fn bounding_box(&self) -> Aabb {
        Shape::bounding_box(self)
    }
}
