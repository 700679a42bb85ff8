//! UI overlays using bevy_egui

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use gardenview_core::PanDirection;
use gardenview_scene::ActiveViewer;

use crate::file_picker::{trigger_file_open, FileImports};
use crate::upload::{GalleryUpload, UploadStatus};

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        // Runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
        app.add_systems(EguiPrimaryContextPass, ui_system);
    }
}

fn ui_system(
    mut contexts: EguiContexts,
    mut viewer: ResMut<ActiveViewer>,
    imports: Res<FileImports>,
    mut upload: ResMut<GalleryUpload>,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };

    if !viewer.is_mounted() {
        return;
    }

    egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            let loading = viewer.is_loading();
            if ui
                .add_enabled(!loading, egui::Button::new("Upload PLY"))
                .clicked()
            {
                trigger_file_open();
            }

            if loading {
                ui.spinner();
                match viewer.progress().and_then(|p| p.fraction()) {
                    Some(fraction) => {
                        ui.add(
                            egui::ProgressBar::new(fraction)
                                .desired_width(120.0)
                                .show_percentage(),
                        );
                    }
                    None => {
                        ui.label("Loading...");
                    }
                }
            }

            if viewer.config().upload.enabled {
                ui.separator();
                let can_save = imports.last_loaded.is_some() && !upload.is_busy();
                if ui
                    .add_enabled(can_save, egui::Button::new("Save to gallery"))
                    .clicked()
                {
                    let config = viewer.config().upload.clone();
                    upload.start(&config, imports.last_loaded.as_ref());
                }
                upload_status_label(ui, upload.status());
            }
        });

        if let Some(error) = viewer.last_error() {
            ui.colored_label(egui::Color32::from_rgb(230, 90, 80), error.to_string());
        }
    });

    egui::Window::new("Navigate")
        .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-12.0, -12.0))
        .resizable(false)
        .collapsible(true)
        .title_bar(false)
        .show(ctx, |ui| {
            egui::Grid::new("pan_pad").show(ui, |ui| {
                ui.label("");
                if ui.button("▲").on_hover_text("Pan forward").clicked() {
                    viewer.pan(PanDirection::Forward);
                }
                ui.label("");
                ui.end_row();

                if ui.button("◀").on_hover_text("Pan left").clicked() {
                    viewer.pan(PanDirection::Left);
                }
                ui.label("");
                if ui.button("▶").on_hover_text("Pan right").clicked() {
                    viewer.pan(PanDirection::Right);
                }
                ui.end_row();

                ui.label("");
                if ui.button("▼").on_hover_text("Pan backward").clicked() {
                    viewer.pan(PanDirection::Backward);
                }
                ui.label("");
                ui.end_row();
            });

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("+").on_hover_text("Zoom in").clicked() {
                    viewer.zoom_in();
                }
                if ui.button("−").on_hover_text("Zoom out").clicked() {
                    viewer.zoom_out();
                }
            });
        });
}

fn upload_status_label(ui: &mut egui::Ui, status: &UploadStatus) {
    match status {
        UploadStatus::Idle => {}
        UploadStatus::Uploading { filename } => {
            ui.spinner();
            ui.label(format!("Saving {}", filename));
        }
        UploadStatus::Saved { filename } => {
            ui.colored_label(egui::Color32::GREEN, format!("Saved {}", filename));
        }
        UploadStatus::Failed(e) => {
            ui.colored_label(egui::Color32::RED, e.to_string());
        }
    }
}
