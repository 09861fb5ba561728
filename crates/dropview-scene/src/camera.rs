//! Camera controls and orbit navigation (Y is up)

use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit};
use bevy::prelude::*;
use bevy_egui::EguiContexts;
use dropview_core::config::CameraConfig;

/// Camera controller settings
#[derive(Debug, Clone, Resource)]
pub struct CameraSettings {
    pub distance: f32,
    pub target_distance: f32,
    pub azimuth: f32,
    pub elevation: f32,
    pub target: Vec3,
    pub target_focus: Vec3,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl CameraSettings {
    /// Orbit around the origin starting from the configured camera position
    pub fn from_config(config: &CameraConfig) -> Self {
        let position = Vec3::from(config.position);
        let distance = position.length().max(config.near * 10.0);
        Self {
            distance,
            target_distance: distance,
            azimuth: position.x.atan2(position.z),
            elevation: (position.y / distance).clamp(-1.0, 1.0).asin(),
            target: Vec3::ZERO,
            target_focus: Vec3::ZERO,
            sensitivity: config.sensitivity,
            zoom_speed: config.zoom_speed,
            smooth_factor: 0.15,
            min_distance: config.near * 10.0,
            max_distance: config.far * 0.5,
        }
    }

    /// Camera position relative to the target
    pub fn orbit_offset(&self) -> Vec3 {
        Vec3::new(
            self.distance * self.elevation.cos() * self.azimuth.sin(),
            self.distance * self.elevation.sin(),
            self.distance * self.elevation.cos() * self.azimuth.cos(),
        )
    }

    /// Screen-right direction on the ground plane
    fn right(&self) -> Vec3 {
        Vec3::new(self.azimuth.cos(), 0.0, -self.azimuth.sin())
    }

    fn zoom(&mut self, steps: f32) {
        let zoom_factor = 1.0 - steps * self.zoom_speed;
        self.target_distance =
            (self.target_distance * zoom_factor).clamp(self.min_distance, self.max_distance);
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Plugin for camera controls
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraSettings>()
            .add_systems(Update, update_camera);
    }
}

fn update_camera(
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
    mut settings: ResMut<CameraSettings>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    time: Res<Time>,
    mut contexts: EguiContexts,
) {
    // Pointer over the UI panel never moves the camera
    let egui_wants_pointer = contexts
        .ctx_mut()
        .is_ok_and(|ctx| ctx.wants_pointer_input());

    let motion = mouse_motion.delta;

    if !egui_wants_pointer {
        // Orbit with left mouse drag
        if mouse_button.pressed(MouseButton::Left) {
            settings.azimuth -= motion.x * settings.sensitivity;
            settings.elevation =
                (settings.elevation + motion.y * settings.sensitivity).clamp(-1.5, 1.5);
        }

        // Pan with right mouse drag, in the camera's screen plane
        if mouse_button.pressed(MouseButton::Right) {
            let right = settings.right();
            let up = settings.orbit_offset().normalize_or_zero().cross(right);
            let pan_speed = settings.distance * 0.002;
            settings.target_focus -= right * motion.x * pan_speed;
            settings.target_focus += up * motion.y * pan_speed;
        }

        let steps = match mouse_scroll.unit {
            MouseScrollUnit::Line => mouse_scroll.delta.y,
            MouseScrollUnit::Pixel => mouse_scroll.delta.y / 100.0,
        };
        if steps != 0.0 {
            settings.zoom(steps);
        }

        // Touch support for mobile
        if touch_input.iter().count() == 1 {
            for touch in touch_input.iter() {
                let delta = touch.delta();
                if delta != Vec2::ZERO {
                    settings.azimuth -= delta.x * settings.sensitivity;
                    settings.elevation =
                        (settings.elevation + delta.y * settings.sensitivity).clamp(-1.5, 1.5);
                }
            }
        }
    }

    // Pinch to zoom
    if touch_input.iter().count() == 2 {
        let touches: Vec<_> = touch_input.iter().collect();
        if let (Some(t1), Some(t2)) = (touches.first(), touches.get(1)) {
            let curr_dist = t1.position().distance(t2.position());
            let prev_dist = (t1.position() - t1.delta()).distance(t2.position() - t2.delta());
            let zoom_factor = prev_dist / curr_dist.max(1.0);
            settings.target_distance = (settings.target_distance * zoom_factor)
                .clamp(settings.min_distance, settings.max_distance);
        }
    }

    // Smooth interpolation for zoom and target
    let dt = time.delta_secs();
    let lerp_factor = 1.0 - (-settings.smooth_factor * 60.0 * dt).exp();
    settings.distance += (settings.target_distance - settings.distance) * lerp_factor;
    settings.target = settings.target + (settings.target_focus - settings.target) * lerp_factor;

    if let Ok(mut transform) = camera_query.single_mut() {
        transform.translation = settings.target + settings.orbit_offset();
        transform.look_at(settings.target, Vec3::Y);
    }
}
