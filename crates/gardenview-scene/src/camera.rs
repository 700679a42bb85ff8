//! Render camera driven by the viewer's orbit camera

use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit};
use bevy::prelude::*;
use bevy_egui::EguiContexts;

use crate::coords::to_render;
use crate::ActiveViewer;

/// Pixels per scroll line for touchpads reporting pixel deltas
const PIXELS_PER_LINE: f32 = 100.0;

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Plugin for camera input and sync
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (orbit_input, wheel_zoom, sync_camera_transform).chain());
    }
}

/// Whether egui is using the pointer (dragging a panel, hovering a button)
fn egui_wants_pointer(contexts: &mut EguiContexts) -> bool {
    contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input() || ctx.is_pointer_over_area())
        .unwrap_or(false)
}

/// Drag with the left button to orbit around the target
fn orbit_input(
    mut viewer: ResMut<ActiveViewer>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    touches: Res<Touches>,
    mut contexts: EguiContexts,
) {
    if egui_wants_pointer(&mut contexts) {
        return;
    }

    if mouse_button.pressed(MouseButton::Left) && mouse_motion.delta != Vec2::ZERO {
        viewer.orbit(mouse_motion.delta.x, mouse_motion.delta.y);
    }

    // Single finger drag orbits on touch screens
    if touches.iter().count() == 1 {
        for touch in touches.iter() {
            let delta = touch.delta();
            if delta != Vec2::ZERO {
                viewer.orbit(delta.x, delta.y);
            }
        }
    }
}

/// Scroll wheel moves the camera toward or away from the target
fn wheel_zoom(
    mut viewer: ResMut<ActiveViewer>,
    scroll: Res<AccumulatedMouseScroll>,
    mut contexts: EguiContexts,
) {
    if scroll.delta.y == 0.0 || egui_wants_pointer(&mut contexts) {
        return;
    }
    let lines = match scroll.unit {
        MouseScrollUnit::Line => scroll.delta.y,
        MouseScrollUnit::Pixel => scroll.delta.y / PIXELS_PER_LINE,
    };
    let step = viewer.config().navigation.wheel_step;
    // Scrolling up moves closer
    viewer.zoom(-lines * step);
}

/// Place the render camera where the orbit camera says it is
fn sync_camera_transform(
    viewer: Res<ActiveViewer>,
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
) {
    let Some(orbit) = viewer.camera() else { return };
    let Ok(mut transform) = camera_query.single_mut() else {
        return;
    };

    let eye = to_render(orbit.position());
    let target = to_render(orbit.target);
    if eye.distance_squared(target) <= f32::EPSILON {
        // Zero radius: keep the last orientation, move onto the target
        transform.translation = eye;
        return;
    }
    *transform = Transform::from_translation(eye).looking_at(target, Vec3::Y);
}
