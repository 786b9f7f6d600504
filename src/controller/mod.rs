// CONTROLLER: Input, camera control and the run loop
pub mod app_loop;
pub mod camera_controller;
pub mod input;
pub mod ready;
pub mod timed_loop;

pub use app_loop::{Application, RunState, Runner, RunnerConfig, StopHandle};
pub use camera_controller::CameraController;
pub use input::{InputEvent, InputState, Key, MouseButton};
pub use ready::ReadySignal;
pub use timed_loop::{TimedLoop, MIN_LOOP_INTERVAL};
