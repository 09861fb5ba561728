//! Side panel using bevy_egui

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use dropview_core::{Dispatcher, SupportedFormat};
use dropview_scene::LiveScene;

use crate::input::{BrowseDialog, PendingInputs};
use crate::loader::{LoadLevel, LoadLog};

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        // bevy_egui 0.38+ runs UI systems in EguiPrimaryContextPass
        app.add_systems(EguiPrimaryContextPass, ui_system);
    }
}

fn level_color(level: LoadLevel) -> egui::Color32 {
    match level {
        LoadLevel::Success => egui::Color32::LIGHT_GREEN,
        LoadLevel::Warning => egui::Color32::YELLOW,
        LoadLevel::Failure => egui::Color32::LIGHT_RED,
    }
}

fn ui_system(
    mut contexts: EguiContexts,
    live: Res<LiveScene>,
    log: Res<LoadLog>,
    dispatcher: NonSend<Dispatcher>,
    pending: NonSend<PendingInputs>,
    mut dialog: NonSendMut<BrowseDialog>,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };

    egui::SidePanel::left("dropview_panel")
        .default_width(260.0)
        .resizable(true)
        .show(ctx, |ui| {
            ui.heading("Dropview");
            ui.separator();

            if ui.button("Browse...").clicked() {
                dialog.open(&pending);
            }
            ui.label(
                egui::RichText::new("or drop a model or texture onto the view")
                    .small()
                    .weak(),
            );

            ui.collapsing("Supported formats", |ui| {
                for format in SupportedFormat::all() {
                    ui.horizontal(|ui| {
                        ui.monospace(format!(".{}", format.extension()));
                        ui.label(format.display_name());
                        match dispatcher.decoders().get(format) {
                            Some(decoder) => {
                                ui.label(egui::RichText::new(decoder.name()).small().weak());
                            }
                            None => {
                                ui.label(
                                    egui::RichText::new("no decoder")
                                        .small()
                                        .color(egui::Color32::LIGHT_RED),
                                );
                            }
                        }
                    });
                }
            });

            ui.separator();
            ui.heading("Scene");

            egui::ScrollArea::vertical()
                .id_salt("scene_nodes")
                .max_height(240.0)
                .show(ui, |ui| {
                    for node in live.children() {
                        ui.horizontal(|ui| {
                            if node.asset.is_reference_helper() {
                                ui.label(egui::RichText::new(&node.asset.name).weak());
                                ui.label(egui::RichText::new("helper").small().weak());
                                return;
                            }
                            ui.label(&node.asset.name);
                            ui.label(
                                egui::RichText::new(format!("{} meshes", node.asset.mesh_count()))
                                    .small(),
                            );
                            let clips = dispatcher.animations(node.id).len();
                            if clips > 0 {
                                ui.label(egui::RichText::new(format!("{} anim", clips)).small());
                            }
                        });
                        if let Some(source) = &node.source {
                            ui.label(egui::RichText::new(source).small().weak());
                        }
                    }
                });

            if dispatcher.in_flight() > 0 {
                ui.separator();
                ui.heading(format!("Loading ({})", dispatcher.in_flight()));
                for (_, entry) in dispatcher.pending() {
                    match entry.progress.and_then(|p| p.percent()) {
                        Some(percent) => {
                            ui.add(
                                egui::ProgressBar::new((percent / 100.0) as f32)
                                    .text(entry.file_name.as_str()),
                            );
                        }
                        None => {
                            ui.horizontal(|ui| {
                                ui.spinner();
                                ui.label(&entry.file_name);
                            });
                        }
                    }
                }
            }

            if !log.is_empty() {
                ui.separator();
                ui.heading("Messages");
                for message in log.iter().rev() {
                    ui.colored_label(level_color(message.level), &message.text);
                }
            }
        });
}
