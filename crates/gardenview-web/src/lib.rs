//! Gardenview Web - Browser viewer for GLB and PLY models
//!
//! Besides the egui overlay, the page can drive the viewer through the
//! exported functions below (file upload, pan, zoom, model selection and
//! teardown).

mod app;
mod bridge;
mod file_picker;
mod ui;
mod upload;

use gardenview_core::PanDirection;
use wasm_bindgen::prelude::*;

use crate::bridge::ViewerCommand;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging with filtering to reduce noise
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::INFO)
            .build(),
    );

    // Run the Bevy app
    app::run();
}

/// Import a file chosen by the page's own file input
#[wasm_bindgen]
pub fn on_file_selected(file: web_sys::File) {
    file_picker::read_file(&file);
}

/// Pan the camera: "forward", "backward", "left" or "right"
#[wasm_bindgen]
pub fn pan(direction: &str) {
    match PanDirection::parse(direction) {
        Some(direction) => bridge::push(ViewerCommand::Pan(direction)),
        None => tracing::warn!("Unknown pan direction: {}", direction),
    }
}

#[wasm_bindgen]
pub fn zoom_in() {
    bridge::push(ViewerCommand::ZoomIn);
}

#[wasm_bindgen]
pub fn zoom_out() {
    bridge::push(ViewerCommand::ZoomOut);
}

/// Replace the current model with a named one from the models directory
#[wasm_bindgen]
pub fn load_model(name: &str) {
    bridge::push(ViewerCommand::LoadModel(name.to_string()));
}

/// Release the viewer and stop rendering
#[wasm_bindgen]
pub fn dispose() {
    bridge::push(ViewerCommand::Dispose);
}
