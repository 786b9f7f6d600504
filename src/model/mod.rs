// MODEL: Scene-independent state
pub mod camera;

pub use camera::{Camera, Projection};
