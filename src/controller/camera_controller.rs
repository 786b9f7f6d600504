use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec3;

use crate::controller::input::{InputState, Key};
use crate::model::Camera;

/// Keeps pitch just short of straight up/down so the view never flips
const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.00001;

/// Handles camera movement and orientation
#[derive(Debug, Clone)]
pub struct CameraController {
    pub move_speed: f32,
    pub sprint_multiplier: f32,
    pub mouse_sensitivity: f32,
}

impl Default for CameraController {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            sprint_multiplier: 2.0,
            mouse_sensitivity: 3.0 / 1000.0,
        }
    }
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move and turn the camera from one frame of input
    pub fn update(&self, camera: &mut Camera, input: &mut InputState, dt: f32) {
        self.update_movement(camera, input, dt);
        let look = input.consume_look();
        self.apply_look(camera, look.x, look.y);
    }

    /// Update camera position based on pressed keys
    pub fn update_movement(&self, camera: &mut Camera, input: &InputState, dt: f32) {
        let mut speed = self.move_speed;
        if input.is_key_pressed(Key::ControlLeft) {
            speed *= self.sprint_multiplier;
        }

        let mut movement = Vec3::ZERO;
        if input.is_key_pressed(Key::W) {
            movement += camera.forward_2d();
        }
        if input.is_key_pressed(Key::S) {
            movement -= camera.forward_2d();
        }
        if input.is_key_pressed(Key::D) {
            movement += camera.right();
        }
        if input.is_key_pressed(Key::A) {
            movement -= camera.right();
        }
        if input.is_key_pressed(Key::Space) {
            movement += camera.up();
        }
        if input.is_key_pressed(Key::ShiftLeft) {
            movement -= camera.up();
        }

        camera.position += movement * speed * dt;
    }

    /// Apply mouse look delta to camera
    pub fn apply_look(&self, camera: &mut Camera, dx: f32, dy: f32) {
        camera.yaw = (camera.yaw + dx * self.mouse_sensitivity).rem_euclid(TAU);
        camera.pitch = (camera.pitch + dy * self.mouse_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}
