//! Gardenview Scene - Bevy rendering of the viewer core
//!
//! The core [`Viewer`] owns all scene and camera state. The plugins in this
//! crate mount it against the primary window, mirror its scene into bevy
//! entities, drive the render camera from its orbit camera, and load GLB
//! assets through the asset server.

pub mod camera;
pub mod coords;
pub mod models;
pub mod scene;

use bevy::prelude::*;
use gardenview_core::{Viewer, ViewerConfig};

/// The mounted viewer shared by every system
#[derive(Resource, Deref, DerefMut)]
pub struct ActiveViewer(pub Viewer);

/// Plugin that sets up the viewer scene, camera and model loading
pub struct GardenviewScenePlugin {
    pub config: ViewerConfig,
}

impl GardenviewScenePlugin {
    pub fn new(config: ViewerConfig) -> Self {
        Self { config }
    }
}

impl Plugin for GardenviewScenePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ActiveViewer(Viewer::new(self.config.clone())))
            .add_plugins(scene::SceneSetupPlugin)
            .add_plugins(camera::CameraPlugin)
            .add_plugins(models::ModelsPlugin);
    }
}

pub use camera::MainCamera;
pub use models::{LoadModelRequest, ModelCache, SceneEntityLink};
pub use scene::DisposeViewer;
