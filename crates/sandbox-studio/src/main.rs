//! Desktop host for the slot sandbox: opens a window, mounts the horse-race
//! scene into it and unmounts on close.
//!
//! Usage: `sandbox-studio [scene.toml]`

mod app;
mod container;

use std::path::Path;

use anyhow::Result;

use sandbox_engine::logging::init_logging;
use sandbox_scene::config::SceneConfig;

fn main() -> Result<()> {
    let config = match std::env::args_os().nth(1) {
        Some(path) => SceneConfig::load(Path::new(&path))?,
        None => {
            let mut config = SceneConfig::horse_race();
            config.assets.base_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets");
            config
        }
    };

    init_logging(config.logging_config());
    log::info!(
        "scene: {} assets from {}",
        config.assets.identifiers.len(),
        config.assets.base_dir.display()
    );

    app::run(config)
}
