//! Scene bootstrap, resize handling and teardown

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use gardenview_core::SurfaceSize;

use crate::camera::MainCamera;
use crate::coords::to_render;
use crate::models::{ModelCache, SceneEntityLink};
use crate::ActiveViewer;

/// Marker component for lights owned by the render setup
#[derive(Component)]
pub struct SceneLight;

/// Message requesting the viewer to release its scene and stop
#[derive(Message)]
pub struct DisposeViewer;

/// Plugin for scene setup
pub struct SceneSetupPlugin;

impl Plugin for SceneSetupPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<DisposeViewer>()
            .add_systems(Startup, setup_scene)
            .add_systems(Update, (handle_resize, teardown_scene));
    }
}

fn surface_of(window: &Window) -> SurfaceSize {
    SurfaceSize::new(window.physical_width(), window.physical_height())
}

fn setup_scene(
    mut commands: Commands,
    mut viewer: ResMut<ActiveViewer>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let surface = windows.single().ok().map(surface_of);
    if !viewer.mount(surface) {
        // No canvas to draw into; leave the app idle
        return;
    }
    let Some(orbit) = viewer.camera().copied() else {
        return;
    };

    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            near: 0.1,
            far: 10000.0,
            ..default()
        }),
        Transform::from_translation(to_render(orbit.position()))
            .looking_at(to_render(orbit.target), Vec3::Y),
        MainCamera,
    ));

    // Soft key light so meshes read as 3D on top of the ambient fixture
    commands.spawn((
        DirectionalLight {
            illuminance: 3000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(4.0, 10.0, -4.0).looking_at(Vec3::ZERO, Vec3::Y),
        SceneLight,
    ));

    tracing::info!(
        fixtures = viewer.scene().fixtures().count(),
        surface = ?viewer.surface(),
        "Scene ready"
    );
}

fn handle_resize(
    mut viewer: ResMut<ActiveViewer>,
    windows: Query<&Window, (With<PrimaryWindow>, Changed<Window>)>,
) {
    if let Ok(window) = windows.single() {
        let surface = surface_of(window);
        if viewer.surface() != Some(surface) {
            viewer.resize(surface);
        }
    }
}

/// Release the viewer, despawn everything it rendered and stop the app
fn teardown_scene(
    mut commands: Commands,
    mut requests: MessageReader<DisposeViewer>,
    mut viewer: ResMut<ActiveViewer>,
    mut model_cache: ResMut<ModelCache>,
    owned: Query<Entity, Or<(With<MainCamera>, With<SceneLight>, With<SceneEntityLink>)>>,
    mut exit: MessageWriter<AppExit>,
) {
    if requests.read().count() == 0 {
        return;
    }

    viewer.unmount();
    model_cache.clear();
    for entity in &owned {
        commands.entity(entity).despawn();
    }
    commands.remove_resource::<AmbientLight>();
    tracing::info!("Viewer disposed");
    exit.write(AppExit::Success);
}
