use std::path::PathBuf;

use thiserror::Error;

use super::StageKind;

#[derive(Error, Debug)]
pub enum ShaderError {
    /// A stage failed to compile; carries the driver's info log
    #[error("{kind} stage failed to compile: {log}")]
    StageCompile { kind: StageKind, log: String },

    /// The program failed to link; carries the driver's info log
    #[error("program failed to link: {0}")]
    Link(String),

    /// A shader source file was missing, unreadable or not UTF-8
    #[error("cannot read shader source {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backend refused to create a shader or program object
    #[error("failed to create GL object: {0}")]
    CreateObject(String),

    /// The fallback shader could not be built; there is nothing left to fall back on
    #[error("fallback shader is unusable: {0}")]
    FatalConfiguration(String),
}

pub type ShaderResult<T> = Result<T, ShaderError>;
