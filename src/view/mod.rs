// VIEW: Window, GL context and UI painting
pub mod gl_window;
pub mod platform;

pub use gl_window::{GlPlatform, GlWindow};
pub use platform::{AppWindow, Platform};
