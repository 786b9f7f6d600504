use crate::controller::InputState;
use crate::error::AppError;

/// Source of windows for the runner.
///
/// Opening happens inside [`Runner::run`](crate::controller::Runner::run) so
/// that setup failures surface through it.
pub trait Platform {
    type Window: AppWindow;

    fn open(&mut self) -> Result<Self::Window, AppError>;
}

/// An open window with a current graphics context and a UI layer.
///
/// Lives on the thread that opened it; the runner only touches it from there.
pub trait AppWindow {
    /// Graphics API handle passed to the application's render hooks
    type Gfx: ?Sized;

    fn gfx(&self) -> &Self::Gfx;

    fn framebuffer_size(&self) -> (u32, u32);

    /// Drain pending window events into `input`.
    ///
    /// Keyboard and mouse events the UI consumes are not forwarded.
    fn poll_events(&mut self, input: &mut InputState);

    fn is_open(&self) -> bool;

    fn request_close(&mut self);

    /// Build one UI frame; it is painted by the next `render_frame`
    fn run_ui(&mut self, build: &mut dyn FnMut(&egui::Context));

    /// Clear, draw the scene, paint the last UI frame on top and present
    fn render_frame(&mut self, scene: &mut dyn FnMut(&Self::Gfx));

    /// Release the UI layer, context and window
    fn teardown(self);
}
