//! Collision detection and response between simple shapes
//!
//! Pure predicates over axis-aligned boxes and spheres. Ground-plane entities
//! are lifted into world space with their vertical coordinate fixed at zero,
//! so spheres behave like circles for everything the simulation does.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::ground_to_world;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        let half = half_extents.abs();
        Self::new(center - half, center + half)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Radius used when pushing shapes apart
    pub fn effective_radius(&self) -> f32 {
        self.half_extents().max_element()
    }

    /// Closest point inside the box to `p`
    pub fn clamp_point(&self, p: Vec3) -> Vec3 {
        p.clamp(self.min, self.max)
    }
}

/// Bounding sphere (a circle for ground-plane entities)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Sphere around a ground-plane position
    pub fn ground(pos: Vec2, radius: f32) -> Self {
        Self::new(ground_to_world(pos), radius)
    }
}

/// Either shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Box(Aabb),
    Sphere(Sphere),
}

impl Shape {
    pub fn center(&self) -> Vec3 {
        match self {
            Shape::Box(b) => b.center(),
            Shape::Sphere(s) => s.center,
        }
    }

    pub fn effective_radius(&self) -> f32 {
        match self {
            Shape::Box(b) => b.effective_radius(),
            Shape::Sphere(s) => s.radius,
        }
    }

    pub fn intersects(&self, other: &Shape) -> bool {
        match (self, other) {
            (Shape::Box(a), Shape::Box(b)) => aabb_aabb(a, b),
            (Shape::Sphere(a), Shape::Sphere(b)) => sphere_sphere(a, b),
            (Shape::Box(b), Shape::Sphere(s)) | (Shape::Sphere(s), Shape::Box(b)) => {
                aabb_sphere(b, s)
            }
        }
    }
}

/// Overlap on all three axes
pub fn aabb_aabb(a: &Aabb, b: &Aabb) -> bool {
    a.min.x <= b.max.x
        && a.max.x >= b.min.x
        && a.min.y <= b.max.y
        && a.max.y >= b.min.y
        && a.min.z <= b.max.z
        && a.max.z >= b.min.z
}

/// Center distance within the sum of radii
pub fn sphere_sphere(a: &Sphere, b: &Sphere) -> bool {
    let r = a.radius + b.radius;
    a.center.distance_squared(b.center) <= r * r
}

/// Clamp the sphere center into the box and compare with the radius
pub fn aabb_sphere(b: &Aabb, s: &Sphere) -> bool {
    let closest = b.clamp_point(s.center);
    closest.distance_squared(s.center) <= s.radius * s.radius
}

/// Result of a contact query
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Contact point on the stationary shape's surface
    pub point: Vec2,
    /// Unit normal pointing from the stationary shape toward the mover
    pub normal: Vec2,
    /// Penetration depth
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Ground-plane circle contact, with the normal used for reflections
pub fn circle_contact(mover: Vec2, mover_radius: f32, other: Vec2, other_radius: f32) -> CollisionResult {
    let delta = mover - other;
    let dist = delta.length();
    let reach = mover_radius + other_radius;
    if dist > reach {
        return CollisionResult::miss();
    }
    // Coincident centers: pick a stable axis instead of NaN
    let normal = if dist > 1e-6 { delta / dist } else { Vec2::X };
    CollisionResult {
        hit: true,
        point: other + normal * other_radius,
        normal,
        penetration: reach - dist,
    }
}

/// Push `moving` out of `stationary` along the separating axis
///
/// Returns the new center for the moving shape, at distance
/// `r_moving + r_stationary` from the stationary center.
pub fn resolve_collision(moving: &Shape, stationary: &Shape) -> Vec3 {
    let from = stationary.center();
    let axis = moving.center() - from;
    let axis = if axis.length_squared() > 1e-12 {
        axis.normalize()
    } else {
        Vec3::X
    };
    from + axis * (moving.effective_radius() + stationary.effective_radius())
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_aabb_overlap_requires_all_axes() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(0.5), Vec3::splat(1.5));
        assert!(aabb_aabb(&a, &b));

        // Overlaps on x and z but not y
        let c = Aabb::new(Vec3::new(0.5, 2.0, 0.5), Vec3::new(1.5, 3.0, 1.5));
        assert!(!aabb_aabb(&a, &c));
    }

    #[test]
    fn test_sphere_touching_counts() {
        let a = Sphere::new(Vec3::ZERO, 1.0);
        let b = Sphere::new(Vec3::new(2.0, 0.0, 0.0), 1.0);
        assert!(sphere_sphere(&a, &b));
        let c = Sphere::new(Vec3::new(2.01, 0.0, 0.0), 1.0);
        assert!(!sphere_sphere(&a, &c));
    }

    #[test]
    fn test_aabb_sphere_corner() {
        let b = Aabb::new(Vec3::ZERO, Vec3::ONE);
        // Diagonal distance from the (1,1,1) corner is sqrt(3) * 0.5 ≈ 0.866
        let near = Sphere::new(Vec3::splat(1.5), 0.9);
        let far = Sphere::new(Vec3::splat(1.5), 0.8);
        assert!(aabb_sphere(&b, &near));
        assert!(!aabb_sphere(&b, &far));
        assert!(Shape::Sphere(near).intersects(&Shape::Box(b)));
    }

    #[test]
    fn test_resolve_collision_pushes_to_sum_of_radii() {
        let moving = Shape::Sphere(Sphere::new(Vec3::new(0.5, 0.0, 0.0), 1.0));
        let stationary = Shape::Sphere(Sphere::new(Vec3::ZERO, 2.0));
        let out = resolve_collision(&moving, &stationary);
        assert!((out - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_resolve_collision_box_uses_largest_half_extent() {
        let moving = Shape::Sphere(Sphere::new(Vec3::new(0.0, 0.0, 1.0), 0.5));
        let stationary = Shape::Box(Aabb::from_center(Vec3::ZERO, Vec3::new(1.0, 1.0, 2.0)));
        let out = resolve_collision(&moving, &stationary);
        assert!((out.z - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_circle_contact_normal_points_at_mover() {
        let result = circle_contact(Vec2::new(1.0, 0.0), 0.5, Vec2::ZERO, 0.75);
        assert!(result.hit);
        assert!((result.normal - Vec2::X).length() < 1e-6);
        assert!((result.penetration - 0.25).abs() < 1e-6);

        assert!(!circle_contact(Vec2::new(3.0, 0.0), 0.5, Vec2::ZERO, 0.75).hit);
    }

    #[test]
    fn test_reflect_velocity() {
        // Moving right, hits vertical wall (normal pointing left)
        let reflected = reflect_velocity(Vec2::new(100.0, 0.0), Vec2::new(-1.0, 0.0));
        assert!((reflected.x - (-100.0)).abs() < 0.001);
        assert!(reflected.y.abs() < 0.001);
    }

    proptest! {
        #[test]
        fn prop_reflection_preserves_speed(vx in -50.0f32..50.0, vy in -50.0f32..50.0, angle in 0.0f32..std::f32::consts::TAU) {
            let v = Vec2::new(vx, vy);
            let n = Vec2::from_angle(angle);
            let r = reflect_velocity(v, n);
            prop_assert!((r.length() - v.length()).abs() < 1e-3);
        }
    }
}
