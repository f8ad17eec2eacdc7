//! I/O for isoviz
//!
//! Volumes are read from and written to VTK XML ImageData (`.vti`) files.
//! The text parameter files that drive the programs (isovalue lists, color
//! ramps and per-surface styles) are parsed by [`params`].

pub mod error;
pub mod params;
pub mod vti;

pub use error::*;
pub use params::{
    parse_color_ramp, parse_isovalues, parse_surface_styles, read_color_ramp, read_isovalues,
    read_surface_styles, SurfaceStyle,
};
pub use vti::{read_vti, write_vti, VtiEncoding, VtiReader, VtiWriter};

use isoviz_core::{ImageVolume, Result};
use std::path::Path;

/// Trait for reading scalar volumes from files
pub trait VolumeReader {
    fn read_volume<P: AsRef<Path>>(path: P) -> Result<ImageVolume>;
}

/// Trait for writing scalar volumes to files
pub trait VolumeWriter {
    fn write_volume<P: AsRef<Path>>(volume: &ImageVolume, path: P) -> Result<()>;
}

/// Auto-detect format and read a volume
pub fn read_volume<P: AsRef<Path>>(path: P) -> Result<ImageVolume> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("vti") => VtiReader::read_volume(path),
        _ => Err(isoviz_core::Error::UnsupportedFormat(format!(
            "Unsupported volume format: {:?}",
            path.extension()
        ))),
    }
}

/// Auto-detect format and write a volume
pub fn write_volume<P: AsRef<Path>>(volume: &ImageVolume, path: P) -> Result<()> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("vti") => VtiWriter::write_volume(volume, path),
        _ => Err(isoviz_core::Error::UnsupportedFormat(format!(
            "Unsupported volume format: {:?}",
            path.extension()
        ))),
    }
}
