//! Several isosurfaces colored through a gradient-magnitude transfer function

use anyhow::{Context, Result};
use clap::Parser;
use isoviz_apps::{init_logging, load_volume, transfer_function_scene, ClipArgs, ViewerArgs};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "isogm")]
#[command(about = "Show several isosurfaces colored by gradient magnitude", long_about = None)]
struct Cli {
    /// Isosurface data volume (.vti)
    data_file: PathBuf,

    /// Gradient magnitude volume (.vti)
    grad_file: PathBuf,

    /// Isovalue list, one value per line
    isovals_file: PathBuf,

    /// Color ramp file with `value r g b` lines
    #[arg(long)]
    cmap: Option<PathBuf>,

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

    let isovalues = isoviz_io::read_isovalues(&cli.isovals_file).with_context(|| {
        format!("Failed to read isovalues from {}", cli.isovals_file.display())
    })?;
    log::info!("Isovalues: {:?}", isovalues);

    let color_points = match &cli.cmap {
        Some(path) => isoviz_io::read_color_ramp(path)
            .with_context(|| format!("Failed to read color ramp from {}", path.display()))?,
        None => Vec::new(),
    };
    if color_points.is_empty() {
        log::info!("Using the default gradient magnitude color ramp");
    }

    let scene =
        transfer_function_scene(data, gradient, isovalues, color_points, cli.clip.offsets());

    isoviz_visualization::show(scene, cli.viewer.config("Isosurfaces - Transfer Function"))?;
    Ok(())
}
