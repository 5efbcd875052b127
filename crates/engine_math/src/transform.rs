//! Spatial transform component.
//!
//! [`Transform`] holds an entity's local position, rotation, and scale, plus
//! the world matrix of its parent, which the transform system refreshes every
//! cycle by walking the `Relation` tree. Only the local part is persisted.

use engine_component::{Component, Encodable, Encoder, encoder};
use glam::{Mat4, Quat, Vec3};

/// Local position, rotation, and scale of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position relative to the parent.
    pub position: Vec3,
    /// Rotation relative to the parent, as a unit quaternion.
    pub rotation: Quat,
    /// Per-axis scale.
    pub scale: Vec3,
    /// World matrix of the parent, identity for roots.
    pub parent_world: Mat4,
}

encoder!(Transform {
    "position" => position: Vec3,
    "rotation" => rotation: Quat,
    "scale" => scale: Vec3,
});

impl Transform {
    /// The identity transform: origin, no rotation, unit scale, no parent.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
        parent_world: Mat4::IDENTITY,
    };

    /// Create a transform from its local parts.
    #[must_use]
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
            parent_world: Mat4::IDENTITY,
        }
    }

    /// Create a new transform with the given position and default rotation/scale.
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Local matrix: translate · rotate · scale.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Replace the local parts by decomposing `matrix`.
    pub fn set_matrix(&mut self, matrix: Mat4) {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        self.scale = scale;
        self.rotation = rotation;
        self.position = position;
    }

    /// World matrix: the parent's world matrix applied to the local one.
    #[must_use]
    pub fn world_matrix(&self) -> Mat4 {
        self.parent_world * self.matrix()
    }

    /// Compose `child` into the space of `self`.
    #[must_use]
    pub fn compose(&self, child: &Transform) -> Transform {
        Transform::new(
            self.matrix().transform_point3(child.position),
            self.rotation * child.rotation,
            self.scale * child.scale,
        )
    }

    /// Translate the transform by the given offset.
    #[must_use]
    pub fn translated(mut self, offset: Vec3) -> Self {
        self.position += offset;
        self
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Component for Transform {
    fn type_name() -> &'static str {
        "Transform"
    }

    fn encoder() -> Option<&'static Encoder<Self>> {
        Some(Self::encoding())
    }
}
