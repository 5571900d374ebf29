use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an entity in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Axis-aligned placement of an entity. Segments are never rotated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_extents(position: Vec3, extents: Extents) -> Self {
        Self {
            position,
            scale: extents.as_vec3(),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// Box dimensions: `width` along X, `height` along Y, `length` along Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extents {
    pub width: f32,
    pub height: f32,
    pub length: f32,
}

impl Extents {
    pub const fn new(width: f32, height: f32, length: f32) -> Self {
        Self {
            width,
            height,
            length,
        }
    }

    /// True when every dimension is finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        [self.width, self.height, self.length]
            .iter()
            .all(|d| d.is_finite() && *d > 0.0)
    }

    pub fn as_vec3(&self) -> Vec3 {
        Vec3::new(self.width, self.height, self.length)
    }
}
