//! Mapping between viewer space and bevy render space
//!
//! Viewer space is left-handed Y-up; bevy is right-handed Y-up. The two
//! differ by a mirrored Z axis, so conversion negates Z in both directions.

use bevy::prelude::*;
use gardenview_core::{glam, MeshTransform};

/// Viewer-space point to render space
pub fn to_render(v: glam::Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, -v.z)
}

/// Array form used for mesh vertex attributes
pub fn to_render_array(v: [f32; 3]) -> [f32; 3] {
    [v[0], v[1], -v[2]]
}

/// Render-space transform of a mirrored entity
pub fn to_render_transform(transform: &MeshTransform) -> Transform {
    Transform::from_translation(to_render(transform.position)).with_scale(Vec3::new(
        transform.scale.x,
        transform.scale.y,
        transform.scale.z,
    ))
}
