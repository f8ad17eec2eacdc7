//! Isosurface colored and windowed by gradient magnitude

use anyhow::Result;
use clap::Parser;
use isoviz_apps::{gradient_scene, init_logging, load_volume, ClipArgs, ViewerArgs};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "iso2dtf")]
#[command(about = "Show an isosurface colored and clipped by gradient magnitude", long_about = None)]
struct Cli {
    /// Isosurface data volume (.vti)
    data_file: PathBuf,

    /// Gradient magnitude volume (.vti)
    grad_file: PathBuf,

    /// Initial isovalue, defaults to the middle of the data range
    #[arg(long = "val", allow_negative_numbers = true)]
    value: Option<f32>,

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
    let scene = gradient_scene(data, gradient, cli.value, cli.clip.offsets());

    isoviz_visualization::show(scene, cli.viewer.config("Isosurface - Gradient Magnitude"))?;
    Ok(())
}
