use thiserror::Error;

use crate::shader::ShaderError;

/// Errors surfaced by the application runner and its platform
#[derive(Error, Debug)]
pub enum AppError {
    /// Window or event loop creation failed
    #[error("window error: {0}")]
    Window(String),

    /// OpenGL display, context or surface creation failed
    #[error("GL context error: {0}")]
    Context(String),

    /// UI painter setup failed
    #[error("UI error: {0}")]
    Ui(String),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    /// The update thread could not be started
    #[error("failed to spawn update thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("update thread panicked")]
    UpdateThreadPanicked,

    /// `Runner::run` was called a second time
    #[error("runner has already been started")]
    AlreadyRun,
}
