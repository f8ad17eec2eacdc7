//! Styled isosurfaces, each with its own gradient window, color and opacity

use anyhow::{Context, Result};
use clap::Parser;
use isoviz_apps::{init_logging, load_volume, styled_scene, ClipArgs, ViewerArgs};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "isocomplete")]
#[command(about = "Show styled, possibly translucent isosurfaces", long_about = None)]
struct Cli {
    /// Isosurface data volume (.vti)
    data_file: PathBuf,

    /// Gradient magnitude volume (.vti)
    grad_file: PathBuf,

    /// Surface parameters, `isovalue gradMin gradMax r g b a` per line
    params_file: PathBuf,

    #[command(flatten)]
    clip: ClipArgs,

    #[command(flatten)]
    viewer: ViewerArgs,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let data = load_volume(&cli.data_file, "Data")?;
    let gradient = load_volume(&cli.grad_file, "Gradient magnitude")?;

    let styles = isoviz_io::read_surface_styles(&cli.params_file).with_context(|| {
        format!("Failed to read surface parameters from {}", cli.params_file.display())
    })?;
    if styles.is_empty() {
        log::warn!("{} defines no surfaces", cli.params_file.display());
    }
    for style in &styles {
        log::info!(
            "Surface at {} with gradient [{}, {}], color {:?}, opacity {}",
            style.isovalue,
            style.gradient_min,
            style.gradient_max,
            style.color,
            style.opacity
        );
    }

    let scene = styled_scene(data, gradient, &styles, cli.clip.offsets());

    isoviz_visualization::show(scene, cli.viewer.config("Isosurfaces"))?;
    Ok(())
}
