use std::process::ExitCode;
use std::sync::Arc;

use glskel::controller::{Runner, RunnerConfig};
use glskel::scene::TriangleDemo;
use glskel::shader::ShaderError;
use glskel::view::GlPlatform;
use glskel::{logging, AppConfig, AppError};

fn main() -> ExitCode {
    logging::init();

    let config = AppConfig::from_env();
    tracing::info!(?config, "starting");

    let mut platform = GlPlatform::new(config.window.clone());
    let app = Arc::new(TriangleDemo::new(config.shader_dir.clone()));
    let mut runner = Runner::new(RunnerConfig::from(&config));

    match runner.run(&mut platform, app) {
        Ok(()) => {
            tracing::info!("shut down cleanly");
            ExitCode::SUCCESS
        }
        Err(AppError::Shader(err @ ShaderError::FatalConfiguration(_))) => {
            tracing::error!("cannot continue without a default shader: {}", err);
            ExitCode::from(2)
        }
        Err(err) => {
            tracing::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
