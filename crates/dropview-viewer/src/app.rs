//! Bevy application setup

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::{prelude::MeshPickingPlugin, DefaultPickingPlugins};
use dropview_core::ViewerConfig;
use dropview_scene::{DropviewScenePlugin, SceneSettings};

use crate::input::InputPlugin;
use crate::loader::LoaderPlugin;
use crate::ui::UiPlugin;

/// Build and run the viewer
pub fn run(config: ViewerConfig) {
    let [r, g, b] = config.scene.background;

    App::new()
        .insert_resource(ClearColor(Color::srgb(r, g, b)))
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Dropview".to_string(),
                canvas: Some("#dropview-canvas".to_string()),
                fit_canvas_to_parent: true,
                // Drop events on the canvas are handled by our own listeners
                prevent_default_event_handling: false,
                ..default()
            }),
            ..default()
        }))
        // Must come before EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .insert_resource(SceneSettings(config))
        .add_plugins(DropviewScenePlugin)
        .add_plugins(InputPlugin)
        .add_plugins(LoaderPlugin)
        .add_plugins(UiPlugin)
        .run();
}
