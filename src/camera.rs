//! # Camera (`camera.rs`)
//!
//! A free-look camera driven by Euler angles. The camera keeps a yaw and a pitch
//! (both in degrees) together with a fixed world "up" direction, and derives an
//! orthonormal right-handed basis from them:
//!
//! ```text
//! front = normalize(cos(pitch)·cos(yaw), sin(pitch), cos(pitch)·sin(yaw))
//! right = normalize(front × world_up)
//! up    = normalize(right × front)
//! ```
//!
//! `right` is taken from `front × world_up` (not the reverse) so the basis keeps
//! its handedness, and `up` is re-derived from `right × front` because `world_up`
//! is only orthogonal to `front` when the pitch is zero.
//!
//! The basis is never stored as independently writable state: every operation
//! that changes the angles rebuilds it through [`Basis::from_angles`], so a
//! reader can never observe a basis that disagrees with the angles.
//!
//! ## Example
//!
//! ```rust
//! use cube_flight::{Camera, Movement};
//!
//! let mut camera = Camera::default();
//! camera.process_mouse_movement(120.0, -40.0, true);
//! camera.process_keyboard(Movement::Forward, 1.0 / 60.0);
//! let view = camera.view_matrix();
//! # let _ = view;
//! ```

use nalgebra_glm::{Mat4, Vec3};

use crate::error::{Error, Result};

/// Pitch is clamped to this many degrees either side of the horizon when
/// mouse movement is constrained.
pub const PITCH_LIMIT: f32 = 89.0;

/// Near clipping plane used by [`Camera::projection_matrix`].
pub const Z_NEAR: f32 = 0.1;

/// Far clipping plane used by [`Camera::projection_matrix`].
pub const Z_FAR: f32 = 100.0;

// Below this length a cross product is treated as the zero vector.
const DEGENERATE_EPSILON: f32 = 1e-6;

/// Symbolic movement directions, decoupled from any windowing system's key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
}

/// Orthonormal camera basis in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis {
    pub front: Vec3,
    pub right: Vec3,
    pub up: Vec3,
}

impl Basis {
    /// Derives the basis from yaw and pitch in degrees.
    ///
    /// When `front` is (nearly) parallel to `world_up` the cross product
    /// collapses; in that case the world axis least aligned with `front` is used
    /// in place of `world_up` so `right` stays well defined.
    pub fn from_angles(yaw: f32, pitch: f32, world_up: &Vec3) -> Self {
        let (yaw, pitch) = (yaw.to_radians(), pitch.to_radians());

        let front = nalgebra_glm::normalize(&nalgebra_glm::vec3(
            pitch.cos() * yaw.cos(),
            pitch.sin(),
            pitch.cos() * yaw.sin(),
        ));

        let mut side = nalgebra_glm::cross(&front, world_up);
        if nalgebra_glm::length(&side) < DEGENERATE_EPSILON {
            side = nalgebra_glm::cross(&front, &least_aligned_axis(&front));
        }

        let right = nalgebra_glm::normalize(&side);
        let up = nalgebra_glm::normalize(&nalgebra_glm::cross(&right, &front));

        Self { front, right, up }
    }
}

fn least_aligned_axis(direction: &Vec3) -> Vec3 {
    let magnitude = nalgebra_glm::abs(direction);
    if magnitude.x <= magnitude.y && magnitude.x <= magnitude.z {
        Vec3::x()
    } else if magnitude.y <= magnitude.z {
        Vec3::y()
    } else {
        Vec3::z()
    }
}

/// A fly-through camera that turns mouse and keyboard input into a view transform.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    world_up: Vec3,
    basis: Basis,
    speed: f32,
    sensitivity: f32,
    fov: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::with_unit_up(
            Vec3::zeros(),
            Vec3::y(),
            Self::DEFAULT_YAW,
            Self::DEFAULT_PITCH,
        )
    }
}

impl Camera {
    pub const DEFAULT_YAW: f32 = 45.0;
    pub const DEFAULT_PITCH: f32 = 0.0;
    pub const DEFAULT_SPEED: f32 = 2.5;
    pub const DEFAULT_SENSITIVITY: f32 = 0.07;
    pub const DEFAULT_FOV: f32 = 90.0;

    /// Creates a camera at `position` looking along the direction given by
    /// `yaw`/`pitch` (degrees).
    ///
    /// `world_up` is normalised and fixed for the camera's lifetime. A zero
    /// (or non-finite) vector is rejected with [`Error::DegenerateWorldUp`].
    pub fn new(position: Vec3, world_up: Vec3, yaw: f32, pitch: f32) -> Result<Self> {
        let length = nalgebra_glm::length(&world_up);
        if !length.is_finite() || length < DEGENERATE_EPSILON {
            return Err(Error::DegenerateWorldUp);
        }

        Ok(Self::with_unit_up(position, world_up / length, yaw, pitch))
    }

    fn with_unit_up(position: Vec3, world_up: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            yaw,
            pitch,
            world_up,
            basis: Basis::from_angles(yaw, pitch, &world_up),
            speed: Self::DEFAULT_SPEED,
            sensitivity: Self::DEFAULT_SENSITIVITY,
            fov: Self::DEFAULT_FOV,
        }
    }

    /// Sets both angles at once. No clamping is applied and yaw is not wrapped.
    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = pitch;
        self.recompute_basis();
    }

    /// Applies a raw mouse offset.
    ///
    /// Offsets are scaled by the sensitivity and added to yaw and pitch. With
    /// `constrain_pitch` the pitch is clamped to ±[`PITCH_LIMIT`] so the view
    /// never flips over the poles. Yaw accumulates without wrapping.
    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32, constrain_pitch: bool) {
        self.yaw += x_offset * self.sensitivity;
        self.pitch += y_offset * self.sensitivity;

        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }

        self.recompute_basis();
    }

    /// Moves the camera along its front or right axis, scaled by
    /// `speed * delta_time` so movement is independent of the frame rate.
    pub fn process_keyboard(&mut self, direction: Movement, delta_time: f32) {
        let velocity = self.speed * delta_time;
        match direction {
            Movement::Forward => self.position += self.basis.front * velocity,
            Movement::Backward => self.position -= self.basis.front * velocity,
            Movement::Left => self.position -= self.basis.right * velocity,
            Movement::Right => self.position += self.basis.right * velocity,
        }
    }

    /// Right-handed look-at transform from `position` towards `position + front`.
    pub fn view_matrix(&self) -> Mat4 {
        nalgebra_glm::look_at_rh(
            &self.position,
            &(self.position + self.basis.front),
            &self.basis.up,
        )
    }

    /// Perspective projection for wgpu's clip space (depth in `0..1`).
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        nalgebra_glm::perspective_rh_zo(aspect_ratio, self.fov.to_radians(), Z_NEAR, Z_FAR)
    }

    fn recompute_basis(&mut self) {
        self.basis = Basis::from_angles(self.yaw, self.pitch, &self.world_up);
    }

    pub fn basis(&self) -> &Basis {
        &self.basis
    }

    pub fn front(&self) -> Vec3 {
        self.basis.front
    }

    pub fn right(&self) -> Vec3 {
        self.basis.right
    }

    pub fn up(&self) -> Vec3 {
        self.basis.up
    }

    pub fn world_up(&self) -> Vec3 {
        self.world_up
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = sensitivity;
    }

    /// Vertical field of view in degrees.
    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 1e-5;

    fn assert_orthonormal(basis: &Basis) {
        for v in [basis.front, basis.right, basis.up] {
            assert!(
                (nalgebra_glm::length(&v) - 1.0).abs() < TOLERANCE,
                "non-unit vector {v:?}"
            );
        }
        assert!(nalgebra_glm::dot(&basis.front, &basis.right).abs() < TOLERANCE);
        assert!(nalgebra_glm::dot(&basis.front, &basis.up).abs() < TOLERANCE);
        assert!(nalgebra_glm::dot(&basis.right, &basis.up).abs() < TOLERANCE);
    }

    #[test]
    fn basis_is_orthonormal_across_the_angle_range() {
        let world_up = Vec3::y();
        for yaw in (0..360).step_by(5) {
            for pitch in (-89..=89).step_by(2) {
                let basis = Basis::from_angles(yaw as f32, pitch as f32, &world_up);
                assert_orthonormal(&basis);
            }
        }
    }

    #[test]
    fn basis_is_right_handed() {
        let basis = Basis::from_angles(30.0, 20.0, &Vec3::y());
        let handed = nalgebra_glm::cross(&basis.right, &basis.up);
        // right × up points backwards, i.e. -front
        assert!(nalgebra_glm::distance(&handed, &(-basis.front)) < TOLERANCE);
    }

    #[test]
    fn default_camera_matches_defaults() {
        let camera = Camera::default();
        assert_eq!(camera.yaw(), 45.0);
        assert_eq!(camera.pitch(), 0.0);
        assert_eq!(camera.speed(), 2.5);
        assert_eq!(camera.sensitivity(), 0.07);
        assert_eq!(camera.fov(), 90.0);
        assert_eq!(camera.world_up(), Vec3::y());

        let expected = nalgebra_glm::vec3(45f32.to_radians().cos(), 0.0, 45f32.to_radians().sin());
        assert!(nalgebra_glm::distance(&camera.front(), &expected) < TOLERANCE);
    }

    #[test]
    fn zero_world_up_is_rejected() {
        let result = Camera::new(Vec3::zeros(), Vec3::zeros(), 0.0, 0.0);
        assert!(matches!(result, Err(Error::DegenerateWorldUp)));
    }

    #[test]
    fn world_up_is_normalised() {
        let camera = Camera::new(Vec3::zeros(), nalgebra_glm::vec3(0.0, 4.0, 0.0), 0.0, 0.0)
            .expect("valid camera");
        assert_eq!(camera.world_up(), Vec3::y());
    }

    #[test]
    fn pitch_is_clamped_exactly_to_the_limit() {
        let mut camera = Camera::default();
        camera.process_mouse_movement(0.0, 10_000.0, true);
        assert_eq!(camera.pitch(), PITCH_LIMIT);

        camera.process_mouse_movement(0.0, -50_000.0, true);
        assert_eq!(camera.pitch(), -PITCH_LIMIT);
        assert_orthonormal(camera.basis());
    }

    #[test]
    fn unconstrained_pitch_is_left_alone() {
        let mut camera = Camera::default();
        camera.set_sensitivity(1.0);
        camera.process_mouse_movement(0.0, 120.0, false);
        assert_eq!(camera.pitch(), 120.0);
    }

    #[test]
    fn yaw_accumulates_without_wrapping() {
        let mut camera = Camera::default();
        camera.set_sensitivity(1.0);
        camera.process_mouse_movement(720.0, 0.0, true);
        assert_eq!(camera.yaw(), 765.0);

        let reference = Basis::from_angles(45.0, 0.0, &Vec3::y());
        assert!(nalgebra_glm::distance(&camera.front(), &reference.front) < 1e-4);
    }

    #[test]
    fn mouse_sequences_are_deterministic() {
        let deltas = [(3.5, -1.25), (-12.0, 7.0), (0.5, 0.5), (400.0, -900.0), (-2.0, 33.0)];

        let run = || {
            let mut camera = Camera::default();
            for (dx, dy) in deltas {
                camera.process_mouse_movement(dx, dy, true);
            }
            *camera.basis()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn set_orientation_rebuilds_the_basis() {
        let mut camera = Camera::default();
        camera.set_orientation(-90.0, 0.0);
        assert!(nalgebra_glm::distance(&camera.front(), &nalgebra_glm::vec3(0.0, 0.0, -1.0)) < TOLERANCE);
        assert!(nalgebra_glm::distance(&camera.right(), &Vec3::x()) < TOLERANCE);
        assert!(nalgebra_glm::distance(&camera.up(), &Vec3::y()) < TOLERANCE);
    }

    #[test]
    fn looking_straight_up_falls_back_to_another_axis() {
        let basis = Basis::from_angles(0.0, 90.0, &Vec3::y());
        assert_orthonormal(&basis);
        assert!(basis.right.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn view_matrix_maps_position_to_origin_and_front_to_negative_z() {
        let mut camera = Camera::new(nalgebra_glm::vec3(1.0, 2.0, 3.0), Vec3::y(), 30.0, -20.0)
            .expect("valid camera");
        camera.process_mouse_movement(15.0, 4.0, true);

        let view = camera.view_matrix();
        let p = camera.position();
        let eye = view * nalgebra_glm::vec4(p.x, p.y, p.z, 1.0);
        assert!(nalgebra_glm::length(&eye.xyz()) < TOLERANCE);

        let ahead = p + camera.front();
        let ahead = view * nalgebra_glm::vec4(ahead.x, ahead.y, ahead.z, 1.0);
        assert!(nalgebra_glm::distance(&ahead.xyz(), &nalgebra_glm::vec3(0.0, 0.0, -1.0)) < TOLERANCE);

        let above = p + camera.up();
        let above = view * nalgebra_glm::vec4(above.x, above.y, above.z, 1.0);
        assert!(nalgebra_glm::distance(&above.xyz(), &Vec3::y()) < TOLERANCE);
    }

    #[test]
    fn keyboard_movement_scales_with_delta_time() {
        let mut camera = Camera::default();
        camera.set_orientation(-90.0, 0.0);

        camera.process_keyboard(Movement::Forward, 0.5);
        assert!(nalgebra_glm::distance(&camera.position(), &nalgebra_glm::vec3(0.0, 0.0, -1.25)) < TOLERANCE);

        camera.process_keyboard(Movement::Right, 2.0);
        assert!(nalgebra_glm::distance(&camera.position(), &nalgebra_glm::vec3(5.0, 0.0, -1.25)) < TOLERANCE);

        camera.process_keyboard(Movement::Backward, 0.5);
        camera.process_keyboard(Movement::Left, 2.0);
        assert!(nalgebra_glm::length(&camera.position()) < TOLERANCE);
    }

    #[test]
    fn projection_uses_the_field_of_view() {
        let mut camera = Camera::default();
        let wide = camera.projection_matrix(1.0);
        camera.set_fov(45.0);
        let narrow = camera.projection_matrix(1.0);
        // a narrower field of view magnifies, i.e. a larger focal term
        assert!(narrow[(1, 1)] > wide[(1, 1)]);
        assert!((wide[(1, 1)] - 1.0).abs() < TOLERANCE);
    }
}
