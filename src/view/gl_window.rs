use std::num::NonZeroU32;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use glow::HasContext;
use glutin::config::{Config, ConfigTemplateBuilder, GlConfig};
use glutin::context::{ContextAttributesBuilder, NotCurrentGlContext, PossiblyCurrentContext};
use glutin::display::{GetGlDisplay, GlDisplay};
use glutin::surface::{GlSurface, Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::raw_window_handle::HasWindowHandle;
use winit::window::{CursorGrabMode, Window, WindowId};

use crate::config::WindowConfig;
use crate::controller::{InputEvent, InputState, Key, MouseButton};
use crate::error::AppError;
use crate::view::{AppWindow, Platform};

const CLEAR_COLOR: [f32; 4] = [0.08, 0.08, 0.1, 1.0];

/// Desktop platform: winit window, glutin GL context, egui overlay
pub struct GlPlatform {
    config: WindowConfig,
}

impl GlPlatform {
    pub fn new(config: WindowConfig) -> Self {
        Self { config }
    }
}

impl Platform for GlPlatform {
    type Window = GlWindow;

    fn open(&mut self) -> Result<GlWindow, AppError> {
        GlWindow::create(&self.config)
    }
}

struct PendingUi {
    primitives: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    pixels_per_point: f32,
}

// Field order is drop order: GL objects go before the context, the context
// before the window.
struct WindowState {
    painter: egui_glow::Painter,
    gl: Arc<glow::Context>,
    context: PossiblyCurrentContext,
    surface: Surface<WindowSurface>,
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,
    pending_ui: Option<PendingUi>,
    open: bool,
    grabbed: bool,
    cursor_position: PhysicalPosition<f64>,
    saved_cursor: Option<PhysicalPosition<f64>>,
    window: Arc<Window>,
}

pub struct GlWindow {
    state: WindowState,
    event_loop: EventLoop<()>,
}

/// Unwind payload for a display that offers no matching GL config
struct NoGlConfig;

/// Candidate with the deepest depth buffer; the first one wins ties
fn deepest<T>(candidates: impl Iterator<Item = T>, depth: impl Fn(&T) -> u8) -> Option<T> {
    candidates.reduce(|best, candidate| if depth(&candidate) > depth(&best) { candidate } else { best })
}

fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    match deepest(configs, |config| config.depth_size()) {
        Some(config) => config,
        // the picker has to hand glutin a config, so leave through `catch_no_config`
        None => std::panic::resume_unwind(Box::new(NoGlConfig)),
    }
}

/// Run a display setup step that calls [`pick_config`], turning an empty
/// config list into an error
fn catch_no_config<R>(step: impl FnOnce() -> R) -> Result<R, AppError> {
    std::panic::catch_unwind(AssertUnwindSafe(step)).map_err(|payload| {
        if payload.is::<NoGlConfig>() {
            AppError::Context("no GL config matches the requested template".into())
        } else {
            std::panic::resume_unwind(payload)
        }
    })
}

/// Whether a window event goes to egui at all.
///
/// While the cursor is grabbed the scene owns the input, but egui still
/// needs the button releases or it keeps the grabbing button held.
fn egui_receives(grabbed: bool, event: &WindowEvent) -> bool {
    !grabbed || matches!(event, WindowEvent::MouseInput { state: ElementState::Released, .. })
}

fn non_zero(size: PhysicalSize<u32>) -> (NonZeroU32, NonZeroU32) {
    (
        NonZeroU32::new(size.width).unwrap_or(NonZeroU32::MIN),
        NonZeroU32::new(size.height).unwrap_or(NonZeroU32::MIN),
    )
}

fn key_from_code(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::KeyW => Some(Key::W),
        KeyCode::KeyA => Some(Key::A),
        KeyCode::KeyS => Some(Key::S),
        KeyCode::KeyD => Some(Key::D),
        KeyCode::Space => Some(Key::Space),
        KeyCode::ShiftLeft => Some(Key::ShiftLeft),
        KeyCode::ControlLeft => Some(Key::ControlLeft),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::KeyP => Some(Key::P),
        KeyCode::KeyO => Some(Key::O),
        _ => None,
    }
}

impl GlWindow {
    fn create(config: &WindowConfig) -> Result<Self, AppError> {
        let event_loop = EventLoop::new().map_err(|e| AppError::Window(e.to_string()))?;

        let attributes = Window::default_attributes()
            .with_title(config.title.as_str())
            .with_inner_size(LogicalSize::new(config.width, config.height));
        let template = ConfigTemplateBuilder::new().with_depth_size(24);

        let (window, gl_config) = catch_no_config(|| {
            glutin_winit::DisplayBuilder::new()
                .with_window_attributes(Some(attributes))
                .build(&event_loop, template, pick_config)
        })?
        .map_err(|e| AppError::Context(e.to_string()))?;
        let window = Arc::new(window.ok_or_else(|| AppError::Window("no window was created".into()))?);

        let raw_window_handle = window
            .window_handle()
            .map_err(|e| AppError::Window(e.to_string()))?
            .as_raw();

        let gl_display = gl_config.display();
        let context_attributes = ContextAttributesBuilder::new().build(Some(raw_window_handle));
        let not_current = unsafe { gl_display.create_context(&gl_config, &context_attributes) }
            .map_err(|e| AppError::Context(e.to_string()))?;

        let (width, height) = non_zero(window.inner_size());
        let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new()
            .build(raw_window_handle, width, height);
        let surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes) }
            .map_err(|e| AppError::Context(e.to_string()))?;

        let context = not_current
            .make_current(&surface)
            .map_err(|e| AppError::Context(e.to_string()))?;

        let interval = if config.vsync {
            SwapInterval::Wait(NonZeroU32::MIN)
        } else {
            SwapInterval::DontWait
        };
        if let Err(err) = surface.set_swap_interval(&context, interval) {
            tracing::warn!("could not set swap interval: {}", err);
        }

        let gl = Arc::new(unsafe {
            glow::Context::from_loader_function_cstr(|symbol| gl_display.get_proc_address(symbol).cast())
        });

        unsafe {
            tracing::info!(
                version = %gl.get_parameter_string(glow::VERSION),
                renderer = %gl.get_parameter_string(glow::RENDERER),
                "GL context ready"
            );
            gl.enable(glow::DEPTH_TEST);
            gl.disable(glow::CULL_FACE);
            gl.viewport(0, 0, width.get() as i32, height.get() as i32);
        }

        let painter = egui_glow::Painter::new(gl.clone(), "", None, false)
            .map_err(|e| AppError::Ui(e.to_string()))?;
        let egui_ctx = egui::Context::default();
        egui_ctx.set_visuals(egui::Visuals::dark());
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &*window,
            Some(window.scale_factor() as f32),
            None,
            Some(painter.max_texture_side()),
        );

        Ok(Self {
            state: WindowState {
                painter,
                gl,
                context,
                surface,
                egui_state,
                egui_ctx,
                pending_ui: None,
                open: true,
                grabbed: false,
                cursor_position: PhysicalPosition::new(0.0, 0.0),
                saved_cursor: None,
                window,
            },
            event_loop,
        })
    }
}

impl WindowState {
    fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        let (width, height) = non_zero(size);
        self.surface.resize(&self.context, width, height);
        unsafe { self.gl.viewport(0, 0, size.width as i32, size.height as i32) };
    }

    fn grab_cursor(&mut self, input: &mut InputState) {
        if self.grabbed {
            return;
        }

        let grabbed = self
            .window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
        if let Err(err) = grabbed {
            tracing::warn!("cursor grab unavailable: {}", err);
            return;
        }

        self.saved_cursor = Some(self.cursor_position);
        self.window.set_cursor_visible(false);
        self.grabbed = true;
        input.process_event(&InputEvent::PointerLockChanged { locked: true });
    }

    fn release_cursor(&mut self, input: &mut InputState) {
        if !self.grabbed {
            return;
        }

        let _ = self.window.set_cursor_grab(CursorGrabMode::None);
        self.window.set_cursor_visible(true);
        if let Some(position) = self.saved_cursor.take() {
            let _ = self.window.set_cursor_position(position);
        }
        self.grabbed = false;
        input.process_event(&InputEvent::PointerLockChanged { locked: false });
    }
}

/// Routes one pump of window events into the input state
struct EventPump<'a> {
    state: &'a mut WindowState,
    input: &'a mut InputState,
}

impl ApplicationHandler for EventPump<'_> {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if window_id != self.state.window.id() {
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.state.open = false;
                return;
            }
            WindowEvent::Resized(size) => {
                self.state.resize(*size);
                self.input.process_event(&InputEvent::Resized { width: size.width, height: size.height });
            }
            WindowEvent::Focused(false) => {
                self.state.release_cursor(self.input);
                self.input.process_event(&InputEvent::FocusLost);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.state.cursor_position = *position;
            }
            _ => {}
        }

        let grabbed = self.state.grabbed;
        if egui_receives(grabbed, &event) {
            let response = self.state.egui_state.on_window_event(&self.state.window, &event);
            if response.consumed && !grabbed {
                return;
            }
        }

        match event {
            WindowEvent::KeyboardInput {
                event: KeyEvent { physical_key: PhysicalKey::Code(code), state, .. },
                ..
            } => {
                if let Some(key) = key_from_code(code) {
                    let event = match state {
                        ElementState::Pressed => InputEvent::KeyDown(key),
                        ElementState::Released => InputEvent::KeyUp(key),
                    };
                    self.input.process_event(&event);
                }
            }
            WindowEvent::MouseInput { state, button: winit::event::MouseButton::Right, .. } => {
                let pressed = state == ElementState::Pressed;
                if pressed {
                    self.state.grab_cursor(self.input);
                } else {
                    self.state.release_cursor(self.input);
                }
                self.input.process_event(&InputEvent::MouseButton { button: MouseButton::Right, pressed });
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.input.process_event(&InputEvent::MouseMove { dx: dx as f32, dy: dy as f32 });
        }
    }
}

impl AppWindow for GlWindow {
    type Gfx = glow::Context;

    fn gfx(&self) -> &glow::Context {
        &self.state.gl
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        let size = self.state.window.inner_size();
        (size.width, size.height)
    }

    fn poll_events(&mut self, input: &mut InputState) {
        let mut pump = EventPump { state: &mut self.state, input };
        if let PumpStatus::Exit(code) = self.event_loop.pump_app_events(Some(Duration::ZERO), &mut pump) {
            tracing::debug!(code, "event loop exited");
            self.state.open = false;
        }
    }

    fn is_open(&self) -> bool {
        self.state.open
    }

    fn request_close(&mut self) {
        self.state.open = false;
    }

    fn run_ui(&mut self, build: &mut dyn FnMut(&egui::Context)) {
        let state = &mut self.state;
        let raw_input = state.egui_state.take_egui_input(&state.window);
        let output = state.egui_ctx.run(raw_input, |ctx| build(ctx));
        state.egui_state.handle_platform_output(&state.window, output.platform_output);

        let primitives = state.egui_ctx.tessellate(output.shapes, output.pixels_per_point);
        state.pending_ui = Some(PendingUi {
            primitives,
            textures_delta: output.textures_delta,
            pixels_per_point: output.pixels_per_point,
        });
    }

    fn render_frame(&mut self, scene: &mut dyn FnMut(&glow::Context)) {
        let state = &mut self.state;
        let size = state.window.inner_size();

        unsafe {
            // the UI painter leaves scissoring on and depth testing off
            state.gl.disable(glow::SCISSOR_TEST);
            state.gl.enable(glow::DEPTH_TEST);
            state.gl.clear_color(CLEAR_COLOR[0], CLEAR_COLOR[1], CLEAR_COLOR[2], CLEAR_COLOR[3]);
            state.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }

        scene(state.gl.as_ref());

        if let Some(ui) = state.pending_ui.take() {
            state.painter.paint_and_update_textures(
                [size.width, size.height],
                ui.pixels_per_point,
                &ui.primitives,
                &ui.textures_delta,
            );
        }

        if let Err(err) = state.surface.swap_buffers(&state.context) {
            tracing::error!("swap_buffers failed: {}", err);
        }
    }

    fn teardown(mut self) {
        let mut input = InputState::new();
        self.state.release_cursor(&mut input);
        self.state.painter.destroy();
        tracing::debug!("window closed");
    }
}
