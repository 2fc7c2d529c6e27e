mod app;
mod report;

pub use app::App;

use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use hljt_experiment::TaskConfig;

/// Optional JSON config next to the binary; defaults apply without it.
const CONFIG_PATH: &str = "hljt_config.json";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config_path = Path::new(CONFIG_PATH);
    let config = if config_path.exists() {
        TaskConfig::load(config_path)
            .with_context(|| format!("invalid config {}", config_path.display()))?
    } else {
        TaskConfig::default()
    };

    let app = App::new(config)?;
    app.run()?;

    Ok(())
}
