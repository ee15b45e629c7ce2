//! Culling and raycast math: rays, bounding boxes, and the view frustum.

use glam::{Mat4, Vec3, Vec4};

/// A bounded ray: an origin plus a displacement whose length is the
/// ray's reach. Grid marches and picking never look past it.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    #[inline]
    pub const fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Farthest distance the ray reaches.
    #[inline]
    pub fn length(&self) -> f32 {
        self.direction.length()
    }

    /// Point along the ray at distance `t` from the origin.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction.normalize_or_zero() * t
    }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, Default)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

/// View frustum as six inward-facing planes (left, right, bottom, top,
/// near, far), each stored as (nx, ny, nz, d).
#[derive(Clone, Copy, Debug)]
pub struct Frustum {
    planes: [Vec4; 6],
}

impl Frustum {
    /// Extract the planes from a view-projection matrix.
    pub fn from_view_projection(vp: Mat4) -> Self {
        let r0 = vp.row(0);
        let r1 = vp.row(1);
        let r2 = vp.row(2);
        let r3 = vp.row(3);

        let mut planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r3 + r2, r3 - r2];
        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }
        Self { planes }
    }

    /// Positive-vertex test: the box is rejected as soon as one plane has
    /// its most favorable corner behind it.
    pub fn contains_aabb(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            let positive = Vec3::new(
                if plane.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            if plane.truncate().dot(positive) + plane.w < 0.0 {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn test_frustum() -> Frustum {
        // Camera at origin looking down -Z.
        let proj = Mat4::perspective_rh_gl(45_f32.to_radians(), 1.0, 0.1, 1000.0);
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        Frustum::from_view_projection(proj * view)
    }

    #[test]
    fn ray_at_walks_unit_distances() {
        let ray = Ray::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, -4.0, 0.0));
        assert_relative_eq!(ray.length(), 4.0);
        assert_eq!(ray.at(0.0), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(ray.at(1.5), Vec3::new(1.0, 0.5, 3.0));
    }

    #[test]
    fn zero_ray_has_zero_reach() {
        let ray = Ray::new(Vec3::ONE, Vec3::ZERO);
        assert_eq!(ray.length(), 0.0);
        assert_eq!(ray.at(2.0), Vec3::ONE);
    }

    #[test]
    fn aabb_center_and_containment() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::new(16.0, 256.0, 16.0));
        assert_relative_eq!(aabb.center().x, 8.0);
        assert!(aabb.contains_point(Vec3::new(8.0, 100.0, 8.0)));
        assert!(!aabb.contains_point(Vec3::new(-0.1, 100.0, 8.0)));
    }

    #[test]
    fn frustum_accepts_box_in_front() {
        let frustum = test_frustum();
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -20.0), Vec3::new(1.0, 1.0, -10.0));
        assert!(frustum.contains_aabb(&aabb));
    }

    #[test]
    fn frustum_rejects_box_behind() {
        let frustum = test_frustum();
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, 10.0), Vec3::new(1.0, 1.0, 20.0));
        assert!(!frustum.contains_aabb(&aabb));
    }

    #[test]
    fn frustum_accepts_straddling_box() {
        let frustum = test_frustum();
        // Large box around the camera intersects the frustum.
        let aabb = Aabb::new(Vec3::splat(-50.0), Vec3::splat(50.0));
        assert!(frustum.contains_aabb(&aabb));
    }
}
