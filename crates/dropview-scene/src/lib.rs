//! Dropview Scene - Bevy scene host for the model viewer
//!
//! This crate renders the core scene graph: it owns the camera and its
//! orbit controls, the lights, and the systems that turn decoded assets into
//! bevy meshes and materials.

pub mod camera;
pub mod convert;
pub mod models;
pub mod scene;

use bevy::prelude::*;

/// Plugin that sets up the 3D scene
pub struct DropviewScenePlugin;

impl Plugin for DropviewScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(models::ModelsPlugin)
            .add_plugins(camera::CameraPlugin)
            .add_plugins(scene::SceneSetupPlugin);
    }
}

pub use camera::{CameraSettings, MainCamera};
pub use models::{LiveScene, ReferenceHelper, SceneMeshRef, SceneNodeEntity, SceneSyncSet};
pub use scene::SceneSettings;
