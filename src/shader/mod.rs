// Shader stages, programs and the GL calls behind them
pub mod backend;
pub mod error;
pub mod program;
pub mod stage;

#[cfg(test)]
pub(crate) mod fake;

pub use backend::ShaderBackend;
pub use error::{ShaderError, ShaderResult};
pub use program::{FallbackShader, ShaderProgram};
pub use stage::StageKind;
