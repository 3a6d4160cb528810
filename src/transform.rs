//! Model transform state, accumulated by input handlers and turned into a
//! matrix once per frame.

use glam::{EulerRot, Mat4, Quat, Vec3};

/// Translation, Euler rotation (radians, XYZ order) and scale of one model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    /// Moves the model by `delta` in world space.
    pub fn translate(&mut self, delta: Vec3) {
        self.translation += delta;
    }

    /// Rotates the model by `delta` radians around each axis.
    pub fn rotate(&mut self, delta: Vec3) {
        self.rotation += delta;
    }

    /// Scales the model by `factor` per axis.
    pub fn grow(&mut self, factor: Vec3) {
        self.scale *= factor;
    }

    /// Builds the model matrix (translation * rotation * scale).
    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_builds_identity_matrix() {
        assert_eq!(Transform::identity().matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_operations_accumulate() {
        let mut t = Transform::identity();
        t.translate(Vec3::new(0.2, -1.0, -5.0));
        t.translate(Vec3::new(0.0, 1.0, 0.0));
        t.rotate(Vec3::new(0.0, 0.1, 0.0));
        t.rotate(Vec3::new(0.0, 0.1, 0.0));
        t.grow(Vec3::splat(3.0));
        t.grow(Vec3::splat(3.0));

        assert_eq!(t.translation, Vec3::new(0.2, 0.0, -5.0));
        assert_eq!(t.rotation, Vec3::new(0.0, 0.2, 0.0));
        assert_eq!(t.scale, Vec3::splat(9.0));
    }

    #[test]
    fn test_matrix_applies_translation_to_origin() {
        let mut t = Transform::identity();
        t.translate(Vec3::new(1.0, 2.0, 3.0));
        let moved = t.matrix().transform_point3(Vec3::ZERO);
        assert_eq!(moved, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_scale_applies_before_rotation_and_translation() {
        let mut t = Transform::identity();
        t.grow(Vec3::splat(2.0));
        t.rotate(Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));
        let p = t.matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        // Scaled to (2, 0, 0), then rotated a quarter turn around +Y.
        assert!((p - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5);
    }
}
