//! Collision detection
//!
//! Boolean intersection tests built on the Separating Axis Theorem. Every test
//! runs the bounding-box rejection first and only then projects onto the
//! edge normals. No penetration depth is reported; tile resolution uses
//! [`Aabb::intersection_depth`] instead.

use glam::Vec2;

use super::geometry::{Aabb, Bounded, Circle, Polygon, Shape};

/// Broad-phase test: do the bounding boxes of `a` and `b` overlap?
#[inline]
pub fn bounding_boxes_overlap(a: &impl Bounded, b: &impl Bounded) -> bool {
    a.bounding_box().overlaps(&b.bounding_box())
}

/// Distance between two projected intervals.
///
/// Positive means the intervals are separated. The branch on `min_a < min_b`
/// picks which gap to measure, so the result is not symmetric in magnitude
/// when the intervals overlap.
#[inline]
pub fn interval_distance(min_a: f32, max_a: f32, min_b: f32, max_b: f32) -> f32 {
    if min_a < min_b {
        min_b - max_a
    } else {
        min_a - max_b
    }
}

/// Project points onto `axis`, returning (min, max)
pub fn project_points(axis: Vec2, points: &[Vec2]) -> (f32, f32) {
    points.iter().fold((f32::MAX, f32::MIN), |(lo, hi), p| {
        let d = axis.dot(*p);
        (lo.min(d), hi.max(d))
    })
}

/// Project a circle onto a unit `axis`, returning (min, max)
#[inline]
pub fn project_circle(axis: Vec2, circle: &Circle) -> (f32, f32) {
    let d = axis.dot(circle.center);
    (d - circle.radius, d + circle.radius)
}

/// Separating axis for an edge: the normalized edge rotated a quarter turn
#[inline]
fn edge_axis(edge: Vec2) -> Vec2 {
    edge.normalize_or_zero().perp()
}

fn sat_polygon_polygon(a: &Polygon, b: &Polygon) -> bool {
    a.edges().iter().chain(b.edges()).all(|edge| {
        let axis = edge_axis(*edge);
        let (min_a, max_a) = project_points(axis, a.vertices());
        let (min_b, max_b) = project_points(axis, b.vertices());
        interval_distance(min_a, max_a, min_b, max_b) <= 0.0
    })
}

fn sat_polygon_circle(poly: &Polygon, circle: &Circle) -> bool {
    poly.edges().iter().all(|edge| {
        let axis = edge_axis(*edge);
        let (min_a, max_a) = project_points(axis, poly.vertices());
        let (min_b, max_b) = project_circle(axis, circle);
        interval_distance(min_a, max_a, min_b, max_b) <= 0.0
    })
}

/// Convex polygon against convex polygon
pub fn polygon_vs_polygon(a: &Polygon, b: &Polygon) -> bool {
    bounding_boxes_overlap(a, b) && sat_polygon_polygon(a, b)
}

/// Convex polygon against circle, using only the polygon's edge axes
pub fn polygon_vs_circle(poly: &Polygon, circle: &Circle) -> bool {
    bounding_boxes_overlap(poly, circle) && sat_polygon_circle(poly, circle)
}

/// Convex polygon against an axis-aligned rectangle
pub fn polygon_vs_rect(poly: &Polygon, rect: &Aabb) -> bool {
    bounding_boxes_overlap(poly, rect) && sat_polygon_polygon(poly, &Polygon::from_aabb(rect))
}

/// Circle against an axis-aligned rectangle (closest-point distance test)
pub fn circle_vs_rect(circle: &Circle, rect: &Aabb) -> bool {
    let closest = circle.center.clamp(rect.min, rect.max);
    circle.center.distance_squared(closest) <= circle.radius * circle.radius
}

/// Circle against circle
pub fn circle_vs_circle(a: &Circle, b: &Circle) -> bool {
    let r = a.radius + b.radius;
    a.center.distance_squared(b.center) <= r * r
}

/// Dispatch over any pair of shapes
pub fn shapes_intersect(a: &Shape, b: &Shape) -> bool {
    match (a, b) {
        (Shape::Polygon(pa), Shape::Polygon(pb)) => polygon_vs_polygon(pa, pb),
        (Shape::Polygon(p), Shape::Circle(c)) | (Shape::Circle(c), Shape::Polygon(p)) => {
            polygon_vs_circle(p, c)
        }
        (Shape::Circle(ca), Shape::Circle(cb)) => circle_vs_circle(ca, cb),
    }
}

/// Ray-casting parity test for an arbitrary (possibly concave) vertex loop
pub fn point_in_polygon(point: Vec2, vertices: &[Vec2]) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }

    let mut crossings = 0;
    let mut p1 = vertices[0];
    for i in 1..=n {
        let p2 = vertices[i % n];
        if point.y > p1.y.min(p2.y)
            && point.y <= p1.y.max(p2.y)
            && point.x <= p1.x.max(p2.x)
            && p1.y != p2.y
        {
            let x_inters = (point.y - p1.y) * (p2.x - p1.x) / (p2.y - p1.y) + p1.x;
            if p1.x == p2.x || point.x <= x_inters {
                crossings += 1;
            }
        }
        p1 = p2;
    }
    crossings % 2 == 1
}
