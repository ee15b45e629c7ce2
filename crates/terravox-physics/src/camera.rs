//! First-person camera: orientation basis, projection, and frustum
//! extraction.

use glam::{Mat4, Vec3};
use terravox_core::math::Frustum;

/// Perspective camera rigidly attached to the player's eye.
pub struct Camera {
    pub position: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    fovy_degrees: f32,
    aspect: f32,
    near_clip: f32,
    far_clip: f32,
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            forward: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            fovy_degrees: 45.0,
            aspect: 1.0,
            near_clip: 0.1,
            far_clip: 1000.0,
        }
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Yaw about the world up axis; keeps the whole basis orthonormal.
    pub fn rotate_on_up_global(&mut self, degrees: f32) {
        let rotation = Mat4::from_axis_angle(Vec3::Y, degrees.to_radians());
        self.forward = rotation.transform_vector3(self.forward).normalize();
        self.right = rotation.transform_vector3(self.right).normalize();
        self.up = rotation.transform_vector3(self.up).normalize();
    }

    /// Pitch about the camera's own right axis. The caller owns the pitch
    /// clamp.
    pub fn rotate_on_right_local(&mut self, degrees: f32) {
        let rotation = Mat4::from_axis_angle(self.right, degrees.to_radians());
        self.forward = rotation.transform_vector3(self.forward).normalize();
        self.up = rotation.transform_vector3(self.up).normalize();
    }

    pub fn view_proj(&self) -> Mat4 {
        Mat4::perspective_rh_gl(
            self.fovy_degrees.to_radians(),
            self.aspect,
            self.near_clip,
            self.far_clip,
        ) * Mat4::look_at_rh(self.position, self.position + self.forward, self.up)
    }

    /// Frustum of the current view, for chunk culling.
    pub fn frustum(&self) -> Frustum {
        Frustum::from_view_projection(self.view_proj())
    }
}

#[cfg(test)]
mod tests {
    use terravox_core::math::Aabb;

    use super::*;

    #[test]
    fn default_basis_is_orthonormal() {
        let camera = Camera::new(Vec3::ZERO);
        assert!(camera.forward().dot(camera.right()).abs() < 1e-6);
        assert!(camera.forward().dot(camera.up()).abs() < 1e-6);
        assert!((camera.forward().length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn yaw_spins_forward_around_y() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.rotate_on_up_global(90.0);
        // -Z yawed 90 degrees counterclockwise lands on -X.
        assert!((camera.forward() - Vec3::NEG_X).length() < 1e-5);
        assert!((camera.up() - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn pitch_keeps_right_fixed() {
        let mut camera = Camera::new(Vec3::ZERO);
        let right_before = camera.right();
        camera.rotate_on_right_local(-45.0);
        assert!((camera.right() - right_before).length() < 1e-6);
        assert!(camera.forward().y < 0.0, "looking down after negative pitch");
    }

    #[test]
    fn frustum_sees_what_is_in_front() {
        let camera = Camera::new(Vec3::new(0.0, 100.0, 0.0));
        let frustum = camera.frustum();
        let ahead = Aabb::new(Vec3::new(-2.0, 98.0, -20.0), Vec3::new(2.0, 102.0, -10.0));
        let behind = Aabb::new(Vec3::new(-2.0, 98.0, 10.0), Vec3::new(2.0, 102.0, 20.0));
        assert!(frustum.contains_aabb(&ahead));
        assert!(!frustum.contains_aabb(&behind));
    }
}
