// Re-export all public modules so they can be used from main.rs
pub mod config;
pub mod error;
pub mod logging;
pub mod scene;
pub mod shader;
pub mod ui;

// MVC Architecture
pub mod controller;
pub mod model;
pub mod view;

pub use config::{AppConfig, WindowConfig};
pub use error::AppError;
