//! Clipped isosurface of a volume, colored by isovalue

use anyhow::Result;
use clap::Parser;
use isoviz_apps::{init_logging, isosurface_scene, load_volume, ClipArgs, ViewerArgs};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "isosurface")]
#[command(about = "Show a clipped isosurface of a VTK ImageData volume", long_about = None)]
struct Cli {
    /// Isosurface data volume (.vti)
    data_file: PathBuf,

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
    let scene = isosurface_scene(data, cli.value, cli.clip.offsets());

    isoviz_visualization::show(scene, cli.viewer.config("Isosurface"))?;
    Ok(())
}
