//! Scene setup - camera, lights, and reference helpers

use bevy::prelude::*;
use dropview_core::{AssetNode, ViewerConfig};
use tracing::info;

use crate::camera::{CameraSettings, MainCamera};
use crate::models::LiveScene;

/// Ambient brightness at intensity 1.0
const AMBIENT_BRIGHTNESS: f32 = 400.0;
/// Directional illuminance (lux) at intensity 1.0
const DIRECTIONAL_ILLUMINANCE: f32 = 4000.0;

/// Viewer configuration as seen by the scene host
#[derive(Debug, Clone, Default, Resource, Deref)]
pub struct SceneSettings(pub ViewerConfig);

/// Marker component for the main directional light
#[derive(Component)]
pub struct MainDirectionalLight;

/// Plugin for scene setup
pub struct SceneSetupPlugin;

impl Plugin for SceneSetupPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneSettings>()
            .add_systems(Startup, setup_scene);
    }
}

fn setup_scene(mut commands: Commands, settings: Res<SceneSettings>, mut live: ResMut<LiveScene>) {
    let camera = &settings.camera;
    let scene = &settings.scene;

    let [r, g, b] = scene.background;
    commands.insert_resource(ClearColor(Color::srgb(r, g, b)));

    commands.insert_resource(CameraSettings::from_config(camera));
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: camera.fov_degrees.to_radians(),
            near: camera.near,
            far: camera.far,
            ..default()
        }),
        Transform::from_translation(Vec3::from(camera.position)).looking_at(Vec3::ZERO, Vec3::Y),
        MainCamera,
    ));

    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: AMBIENT_BRIGHTNESS * scene.ambient_intensity,
        ..default()
    });

    commands.spawn((
        DirectionalLight {
            illuminance: DIRECTIONAL_ILLUMINANCE * scene.directional_intensity,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(5.0, 10.0, 7.5).looking_at(Vec3::ZERO, Vec3::Y),
        MainDirectionalLight,
    ));

    // Helpers live in the scene graph so texture drops can skip them
    live.add_top_level_child(AssetNode::axes_helper(scene.axes_length), None);
    live.add_top_level_child(
        AssetNode::grid_plane(scene.grid_size, scene.grid_divisions),
        None,
    );

    info!(
        fov = camera.fov_degrees,
        axes = scene.axes_length,
        grid = scene.grid_size,
        "Scene ready"
    );
}
