use std::path::PathBuf;

use meshpaint::{app::MeshPaintApp, config::ViewerConfig};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut app = MeshPaintApp::new(ViewerConfig::default())?;
    if let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) {
        app.open(&path);
    }
    app.run()
}
