//! Shared pieces of the isoviz programs: argument groups, logging setup,
//! volume loading and the scene each program shows.

pub mod cli;
pub mod scenes;

pub use cli::*;
pub use scenes::*;

use anyhow::{Context, Result};
use isoviz_core::ImageVolume;
use std::path::Path;
use std::sync::Arc;

/// Initialise `env_logger` with an `info` default, overridable by `RUST_LOG`
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// Load a volume and log its summary
pub fn load_volume(path: &Path, what: &str) -> Result<Arc<ImageVolume>> {
    let volume = isoviz_io::read_volume(path)
        .with_context(|| format!("Failed to load {} volume {}", what, path.display()))?;
    log::info!("{} volume {}: {}", what, path.display(), volume_summary(&volume));
    Ok(Arc::new(volume))
}

/// One-line description of a volume's lattice and value range
pub fn volume_summary(volume: &ImageVolume) -> String {
    let (min, max) = volume.scalar_range();
    let o = volume.origin;
    format!(
        "dimensions {:?}, spacing {:?}, origin ({}, {}, {}), scalar range [{}, {}]",
        volume.dimensions, volume.spacing, o.x, o.y, o.z, min, max
    )
}
