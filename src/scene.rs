use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use glam::{Vec2, Vec3};
use glow::HasContext;
use parking_lot::Mutex;

use crate::controller::Application;
use crate::error::AppError;
use crate::model::{Camera, Projection};
use crate::shader::{FallbackShader, ShaderBackend, ShaderProgram, ShaderResult, StageKind};

/// Seconds for one full orbit of each vertex
pub const LOOP_PERIOD: f32 = 5.0;
/// Distance of each vertex from its rest position
pub const ORBIT_RADIUS: f32 = 0.12;
const SIGMOID_STEEPNESS: f32 = 5.0;

const REST_POSITIONS: [Vec2; 3] = [Vec2::new(0.0, 0.5), Vec2::new(-0.5, -0.5), Vec2::new(0.5, -0.5)];
const PHASE_OFFSETS: [f32; 3] = [0.0, 120.0, 240.0];
const COLORS: [[f32; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.5, 0.0, 1.0]];

const VERTEX_FILE: &str = "triangle.vert";
const FRAGMENT_FILE: &str = "triangle.frag";

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-SIGMOID_STEEPNESS * x).exp())
}

/// S-curve over one loop: 0 at `x = 0`, 1 at `x = 1`
pub fn ease(x: f32) -> f32 {
    let low = sigmoid(-0.5);
    let high = sigmoid(0.5);
    (sigmoid(x - 0.5) - low) / (high - low)
}

/// Vertex positions after `time` seconds of animation
pub fn triangle_positions(time: f32) -> [Vec3; 3] {
    let phase = ease(time.rem_euclid(LOOP_PERIOD) / LOOP_PERIOD);

    let mut positions = [Vec3::ZERO; 3];
    for (i, position) in positions.iter_mut().enumerate() {
        let angle = (phase * 360.0 + PHASE_OFFSETS[i]).to_radians();
        let rest = REST_POSITIONS[i];
        *position = Vec3::new(
            rest.x + angle.cos() * ORBIT_RADIUS,
            rest.y + angle.sin() * ORBIT_RADIUS,
            0.0,
        );
    }
    positions
}

struct GpuResources {
    shader: ShaderProgram<glow::Context>,
    fallback: FallbackShader<glow::Context>,
    vertex_array: glow::VertexArray,
    position_buffer: glow::Buffer,
    color_buffer: glow::Buffer,
}

/// Three colored vertices circling their rest positions
pub struct TriangleDemo {
    shader_dir: PathBuf,
    clock: Mutex<f32>,
    positions: Mutex<[Vec3; 3]>,
    gpu: Mutex<Option<GpuResources>>,
    paused: AtomicBool,
    reload_requested: AtomicBool,
    using_fallback: AtomicBool,
}

impl TriangleDemo {
    pub fn new(shader_dir: impl Into<PathBuf>) -> Self {
        Self {
            shader_dir: shader_dir.into(),
            clock: Mutex::new(0.0),
            positions: Mutex::new(triangle_positions(0.0)),
            gpu: Mutex::new(None),
            paused: AtomicBool::new(false),
            reload_requested: AtomicBool::new(false),
            using_fallback: AtomicBool::new(false),
        }
    }

    pub fn positions(&self) -> [Vec3; 3] {
        *self.positions.lock()
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }
}

/// (Re)load both stages from `shader_dir` and link; false leaves the program unusable
fn load_triangle_shader<B: ShaderBackend>(gl: &B, shader: &mut ShaderProgram<B>, shader_dir: &Path) -> bool {
    let loaded = shader
        .add_file(gl, StageKind::Vertex, shader_dir.join(VERTEX_FILE))
        .and_then(|()| shader.add_file(gl, StageKind::Fragment, shader_dir.join(FRAGMENT_FILE)))
        .and_then(|()| shader.compile(gl));

    match loaded {
        Ok(()) => {
            tracing::info!(dir = %shader_dir.display(), "triangle shader loaded");
            true
        }
        Err(err) => {
            tracing::warn!("triangle shader unavailable, drawing with the fallback: {}", err);
            false
        }
    }
}

/// The fallback and the triangle program. Only the fallback has to build;
/// on error nothing is left allocated.
fn build_programs<B: ShaderBackend>(gl: &B, shader_dir: &Path) -> ShaderResult<(ShaderProgram<B>, FallbackShader<B>)> {
    let fallback = FallbackShader::new(gl)?;
    let mut shader = ShaderProgram::new();
    load_triangle_shader(gl, &mut shader, shader_dir);
    Ok((shader, fallback))
}

/// Vertex array plus position and color buffers, released again if any of them fails
unsafe fn create_buffers(
    gl: &glow::Context,
    positions: &[[f32; 3]; 3],
) -> Result<(glow::VertexArray, glow::Buffer, glow::Buffer), String> {
    let vertex_array = gl.create_vertex_array()?;
    let position_buffer = match gl.create_buffer() {
        Ok(buffer) => buffer,
        Err(err) => {
            gl.delete_vertex_array(vertex_array);
            return Err(err);
        }
    };
    let color_buffer = match gl.create_buffer() {
        Ok(buffer) => buffer,
        Err(err) => {
            gl.delete_buffer(position_buffer);
            gl.delete_vertex_array(vertex_array);
            return Err(err);
        }
    };

    gl.bind_buffer(glow::ARRAY_BUFFER, Some(position_buffer));
    gl.buffer_data_u8_slice(
        glow::ARRAY_BUFFER,
        bytemuck::cast_slice::<[f32; 3], u8>(positions),
        glow::DYNAMIC_DRAW,
    );
    gl.bind_buffer(glow::ARRAY_BUFFER, Some(color_buffer));
    gl.buffer_data_u8_slice(
        glow::ARRAY_BUFFER,
        bytemuck::cast_slice::<[f32; 3], u8>(&COLORS),
        glow::STATIC_DRAW,
    );
    gl.bind_buffer(glow::ARRAY_BUFFER, None);

    Ok((vertex_array, position_buffer, color_buffer))
}

impl Application<glow::Context> for TriangleDemo {
    fn init(&self, gl: &glow::Context, camera: &mut Camera) -> Result<(), AppError> {
        let positions = self.positions().map(|p| p.to_array());
        let (vertex_array, position_buffer, color_buffer) =
            unsafe { create_buffers(gl, &positions) }.map_err(AppError::Context)?;

        let (shader, fallback) = match build_programs(gl, &self.shader_dir) {
            Ok(programs) => programs,
            Err(err) => {
                unsafe {
                    gl.delete_buffer(position_buffer);
                    gl.delete_buffer(color_buffer);
                    gl.delete_vertex_array(vertex_array);
                }
                return Err(err.into());
            }
        };

        *self.gpu.lock() = Some(GpuResources {
            shader,
            fallback,
            vertex_array,
            position_buffer,
            color_buffer,
        });

        camera.position = Vec3::new(0.2, 0.0, 1.5);
        camera.yaw = 0.0;
        camera.pitch = 0.0;
        camera.set_projection(Projection::Perspective);
        Ok(())
    }

    fn stop(&self, gl: &glow::Context) {
        let Some(mut gpu) = self.gpu.lock().take() else {
            return;
        };

        gpu.shader.clear(gl);
        gpu.fallback.clear(gl);
        unsafe {
            gl.delete_buffer(gpu.position_buffer);
            gl.delete_buffer(gpu.color_buffer);
            gl.delete_vertex_array(gpu.vertex_array);
        }
    }

    fn update(&self, timestep: f32) {
        if self.paused.load(Ordering::Relaxed) {
            return;
        }

        let time = {
            let mut clock = self.clock.lock();
            *clock = (*clock + timestep).rem_euclid(LOOP_PERIOD);
            *clock
        };
        *self.positions.lock() = triangle_positions(time);
    }

    fn render(&self, gl: &glow::Context, camera: &Camera) {
        let positions = self.positions().map(|p| p.to_array());
        let mut gpu = self.gpu.lock();
        let Some(gpu) = gpu.as_mut() else {
            return;
        };

        if self.reload_requested.swap(false, Ordering::Relaxed) {
            load_triangle_shader(gl, &mut gpu.shader, &self.shader_dir);
        }

        let (program, shader) = match gpu.shader.current_id() {
            Some(program) => (program, &gpu.shader),
            None => {
                if let Err(err) = gpu.fallback.ensure(gl) {
                    tracing::error!("no usable shader: {}", err);
                    return;
                }
                match gpu.fallback.id() {
                    Some(program) => (program, gpu.fallback.program()),
                    None => return,
                }
            }
        };
        self.using_fallback.store(!gpu.shader.is_valid(), Ordering::Relaxed);

        let mvp = camera.view_proj();
        unsafe {
            gl.use_program(Some(program));
            gl.uniform_matrix_4_f32_slice(shader.uniform_location("MVP").as_ref(), false, &mvp.to_cols_array());

            gl.bind_vertex_array(Some(gpu.vertex_array));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(gpu.position_buffer));
            gl.buffer_sub_data_u8_slice(glow::ARRAY_BUFFER, 0, bytemuck::cast_slice::<[f32; 3], u8>(&positions));

            // attribute slots differ between the loaded and the fallback program
            if let Some(location) = shader.attribute_location("vPos") {
                gl.enable_vertex_attrib_array(location);
                gl.vertex_attrib_pointer_f32(location, 3, glow::FLOAT, false, 0, 0);
            }
            if let Some(location) = shader.attribute_location("vCol") {
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(gpu.color_buffer));
                gl.enable_vertex_attrib_array(location);
                gl.vertex_attrib_pointer_f32(location, 3, glow::FLOAT, false, 0, 0);
            }

            gl.draw_arrays(glow::TRIANGLES, 0, 3);

            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_vertex_array(None);
            gl.use_program(None);
        }
    }

    fn update_ui(&self, ctx: &egui::Context) {
        egui::Window::new("Triangle")
            .default_pos([8.0, 200.0])
            .resizable(false)
            .show(ctx, |ui| {
                let fallback = self.using_fallback.load(Ordering::Relaxed);
                ui.label(if fallback { "shader: fallback" } else { "shader: triangle" });

                let mut paused = self.paused.load(Ordering::Relaxed);
                if ui.checkbox(&mut paused, "Pause").changed() {
                    self.set_paused(paused);
                }
                if ui.button("Reload shaders").clicked() {
                    self.reload_requested.store(true, Ordering::Relaxed);
                }
            });
    }
}
