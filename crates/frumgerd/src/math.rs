//! Math types and glam re-exports.
//!
//! Entity records carry their local transform as a [`Mat4`]. The [`Transform`]
//! type is the decomposed view of such a matrix: position, rotation, and scale.
//! Composition uses glam's column-vector convention, so a child's global matrix
//! is `parent_global * child_local`.

pub use glam::{Mat4, Quat, Vec3};

/// A decomposed pose: position, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform (origin, no rotation, uniform scale of 1).
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Create a transform at the given position.
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: Vec3::new(x, y, z),
            ..Self::IDENTITY
        }
    }

    /// Decompose a matrix into translation, rotation, and scale.
    ///
    /// The identity matrix decomposes to [`Transform::IDENTITY`].
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Return a copy rotated around the Y axis (yaw) by `radians`.
    pub fn with_yaw(mut self, radians: f32) -> Self {
        self.rotation = Quat::from_rotation_y(radians);
        self
    }

    /// Return a copy with uniform scale applied.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// Compute the 4x4 model matrix.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// True if every part is within `max_abs_diff` of `other`.
    pub fn abs_diff_eq(&self, other: &Self, max_abs_diff: f32) -> bool {
        self.translation.abs_diff_eq(other.translation, max_abs_diff)
            && self.rotation.abs_diff_eq(other.rotation, max_abs_diff)
            && self.scale.abs_diff_eq(other.scale, max_abs_diff)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Transform> for Mat4 {
    fn from(transform: Transform) -> Self {
        transform.matrix()
    }
}

/// Combine a local matrix with the global matrix of its parent.
///
/// Roots pass `None` and get their local matrix back unchanged. An absent
/// local matrix counts as identity.
pub fn compose(local: Option<Mat4>, parent_global: Option<Mat4>) -> Mat4 {
    let local = local.unwrap_or(Mat4::IDENTITY);
    match parent_global {
        Some(parent) => parent * local,
        None => local,
    }
}
