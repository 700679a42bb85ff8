//! Commands from page-level JavaScript into the Bevy app
//!
//! Exported functions run outside the Bevy schedule, so they only queue a
//! command. A system drains the queue once per frame.

use bevy::prelude::*;
use gardenview_core::PanDirection;
use gardenview_scene::{ActiveViewer, DisposeViewer, LoadModelRequest};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerCommand {
    Pan(PanDirection),
    ZoomIn,
    ZoomOut,
    LoadModel(String),
    Dispose,
}

static COMMANDS: Mutex<VecDeque<ViewerCommand>> = Mutex::new(VecDeque::new());

pub fn push(command: ViewerCommand) {
    if let Ok(mut queue) = COMMANDS.lock() {
        queue.push_back(command);
    }
}

fn drain() -> Vec<ViewerCommand> {
    COMMANDS
        .lock()
        .map(|mut queue| queue.drain(..).collect())
        .unwrap_or_default()
}

/// Plugin applying queued page commands
pub struct BridgePlugin;

impl Plugin for BridgePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreUpdate, apply_commands);
    }
}

fn apply_commands(
    mut viewer: ResMut<ActiveViewer>,
    mut load_requests: MessageWriter<LoadModelRequest>,
    mut dispose_requests: MessageWriter<DisposeViewer>,
) {
    for command in drain() {
        tracing::debug!("Page command: {:?}", command);
        match command {
            ViewerCommand::Pan(direction) => viewer.pan(direction),
            ViewerCommand::ZoomIn => viewer.zoom_in(),
            ViewerCommand::ZoomOut => viewer.zoom_out(),
            ViewerCommand::LoadModel(name) => {
                load_requests.write(LoadModelRequest { name });
            }
            ViewerCommand::Dispose => {
                dispose_requests.write(DisposeViewer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_preserves_order() {
        push(ViewerCommand::ZoomIn);
        push(ViewerCommand::Pan(PanDirection::Left));
        push(ViewerCommand::LoadModel("garden".to_string()));

        assert_eq!(
            drain(),
            vec![
                ViewerCommand::ZoomIn,
                ViewerCommand::Pan(PanDirection::Left),
                ViewerCommand::LoadModel("garden".to_string()),
            ]
        );
        assert!(drain().is_empty());
    }
}
