use egui::Context;

use crate::model::{Camera, Projection};

/// Frame rate averaged over roughly one second
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    fps: f32,
    frame_count: u32,
    fps_timer: f32,
    last_dt: f32,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, dt: f32) {
        self.last_dt = dt;
        self.frame_count += 1;
        self.fps_timer += dt;
        if self.fps_timer >= 1.0 {
            self.fps = self.frame_count as f32 / self.fps_timer;
            self.frame_count = 0;
            self.fps_timer = 0.0;
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frame_time_ms(&self) -> f32 {
        self.last_dt * 1000.0
    }
}

/// Debug window with frame timing, camera state and the control hints
pub fn draw_debug_window(ctx: &Context, camera: &Camera, stats: &FrameStats) {
    let position = camera.position;
    let projection = match camera.projection() {
        Projection::Perspective => "perspective",
        Projection::Orthographic => "orthographic",
    };

    egui::Window::new("Debug")
        .default_pos([8.0, 8.0])
        .default_open(false)
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(format!("FPS: {:.0} ({:.2} ms)", stats.fps(), stats.frame_time_ms())).small());
            ui.label(egui::RichText::new(format!("Pos: x: {:.2} y: {:.2} z: {:.2}", position.x, position.y, position.z)).small());
            ui.label(egui::RichText::new(format!("Yaw: {:.1} Pitch: {:.1}", camera.yaw.to_degrees(), camera.pitch.to_degrees())).small());
            ui.label(egui::RichText::new(format!("Projection: {projection}")).small());
            ui.separator();
            ui.label(egui::RichText::new("Controls:").small());
            ui.label(egui::RichText::new("Right mouse - Look").small());
            ui.label(egui::RichText::new("WASD - Move").small());
            ui.label(egui::RichText::new("Space - Up").small());
            ui.label(egui::RichText::new("Shift - Down").small());
            ui.label(egui::RichText::new("Ctrl - Speed boost").small());
            ui.label(egui::RichText::new("P - Toggle projection").small());
            ui.label(egui::RichText::new("O - Log camera").small());
            ui.label(egui::RichText::new("Esc - Quit").small());
        });
}
