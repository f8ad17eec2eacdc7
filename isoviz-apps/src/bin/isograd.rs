//! Compute the gradient magnitude volume consumed by the other programs

use anyhow::{Context, Result};
use clap::Parser;
use isoviz_apps::{init_logging, load_volume, volume_summary};
use isoviz_filters::gradient_magnitude;
use isoviz_io::{write_vti, VtiEncoding};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "isograd")]
#[command(about = "Write the gradient magnitude of a volume as a .vti file", long_about = None)]
struct Cli {
    /// Input data volume (.vti)
    data_file: PathBuf,

    /// Output gradient magnitude volume (.vti)
    output: PathBuf,

    /// Write values as text instead of raw appended data
    #[arg(long)]
    ascii: bool,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let data = load_volume(&cli.data_file, "Data")?;

    let start = Instant::now();
    let gradient = gradient_magnitude(&data);
    log::info!(
        "Gradient magnitude computed in {:.2?}: {}",
        start.elapsed(),
        volume_summary(&gradient)
    );

    let encoding = if cli.ascii {
        VtiEncoding::Ascii
    } else {
        VtiEncoding::AppendedRaw
    };
    write_vti(&gradient, &cli.output, encoding)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    log::info!("Wrote {}", cli.output.display());
    Ok(())
}
