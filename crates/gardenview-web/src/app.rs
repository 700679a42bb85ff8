//! Bevy application setup

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::{prelude::MeshPickingPlugin, DefaultPickingPlugins};
use gardenview_core::ViewerConfig;
use gardenview_scene::{GardenviewScenePlugin, LoadModelRequest};

use crate::bridge::BridgePlugin;
use crate::file_picker::FilePickerPlugin;
use crate::ui::UiPlugin;
use crate::upload::UploadPlugin;

/// Configuration shipped with the wasm bundle
const EMBEDDED_CONFIG: &str = include_str!("../viewer.toml");

/// Parse the embedded configuration, falling back to defaults
fn load_config() -> ViewerConfig {
    match ViewerConfig::from_toml(EMBEDDED_CONFIG) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Invalid viewer.toml, using defaults: {}", e);
            ViewerConfig::default()
        }
    }
}

/// Run the Bevy application
pub fn run() {
    let config = load_config();
    let canvas = config.scene.canvas.clone();

    App::new()
        .insert_resource(ClearColor(Color::srgb(0.75, 0.85, 0.95))) // Pale sky
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Gardenview".to_string(),
                    canvas: Some(canvas),
                    fit_canvas_to_parent: true,
                    prevent_default_event_handling: false,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                // Models are served relative to the page
                file_path: "".to_string(),
                // Don't look for .meta files - server doesn't have them
                meta_check: bevy::asset::AssetMetaCheck::Never,
                ..default()
            })
        )
        // Picking must be added BEFORE EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .add_plugins(GardenviewScenePlugin::new(config))
        .add_plugins(BridgePlugin)
        .add_plugins(FilePickerPlugin)
        .add_plugins(UploadPlugin)
        .add_plugins(UiPlugin)
        .add_systems(PostStartup, check_url_parameters)
        .run();
}

/// Load the model named by `?model=` once the scene is mounted
fn check_url_parameters(mut requests: MessageWriter<LoadModelRequest>) {
    if let Some(name) = model_parameter() {
        tracing::info!("Loading model from URL parameter: {}", name);
        requests.write(LoadModelRequest { name });
    }
}

#[cfg(target_arch = "wasm32")]
fn model_parameter() -> Option<String> {
    let href = web_sys::window()?.location().href().ok()?;
    let url = web_sys::Url::new(&href).ok()?;
    url.search_params()
        .get("model")
        .filter(|name| !name.trim().is_empty())
}

#[cfg(not(target_arch = "wasm32"))]
fn model_parameter() -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_parses() {
        let config = ViewerConfig::from_toml(EMBEDDED_CONFIG).unwrap();
        assert_eq!(config.scene.canvas, "#viewer-canvas");
        assert_eq!(config.assets.models_dir, "models");
        assert!(config.camera.clamp_zoom);
    }
}
