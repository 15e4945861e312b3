mod app;
mod input;
mod meshes;
mod shaders;

use veil_engine::device::GpuInit;
use veil_engine::logging::{LoggingConfig, init_logging};
use veil_engine::render::PipelineConfig;
use veil_engine::window::{Runtime, RuntimeConfig};

use app::ViewerApp;

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    log::info!("controls: W/S zoom, A/D pan, left-drag orbit, wheel zoom");

    let config = RuntimeConfig::default();
    let app = ViewerApp::new(config.title.clone(), PipelineConfig::default());
    Runtime::run(config, GpuInit::default(), app)
}
