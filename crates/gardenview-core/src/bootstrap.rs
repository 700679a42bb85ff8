//! Scene bootstrap: fixtures and the initial camera

use thiserror::Error;
use tracing::info;

use crate::camera::OrbitCamera;
use crate::config::ViewerConfig;
use crate::scene::{EntityPayload, Scene, AMBIENT_LIGHT_NAME, GROUND_NAME};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InitError {
    #[error("Rendering surface is not available")]
    SurfaceUnavailable,
    #[error("Rendering surface has zero size ({width}x{height})")]
    EmptySurface { width: u32, height: u32 },
}

/// Pixel size of the surface the viewer renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Build the fixture scene and the initial camera for a surface
pub fn initialize(
    surface: Option<SurfaceSize>,
    config: &ViewerConfig,
) -> Result<(Scene, OrbitCamera), InitError> {
    let surface = surface.ok_or(InitError::SurfaceUnavailable)?;
    if surface.width == 0 || surface.height == 0 {
        return Err(InitError::EmptySurface {
            width: surface.width,
            height: surface.height,
        });
    }

    let mut scene = Scene::new();
    scene.spawn_fixture(
        AMBIENT_LIGHT_NAME,
        EntityPayload::AmbientLight {
            intensity: config.scene.ambient_intensity,
        },
    );
    if config.scene.show_ground {
        scene.spawn_fixture(
            GROUND_NAME,
            EntityPayload::Ground {
                size: config.scene.ground_size,
            },
        );
    }

    let camera = OrbitCamera::from_config(&config.camera);
    info!(
        width = surface.width,
        height = surface.height,
        fixtures = scene.len(),
        "Viewer scene initialized"
    );
    Ok((scene, camera))
}
