//! Text parameter files
//!
//! All formats share the same line rules: lines starting with `#` are
//! comments, blank lines are skipped, fields are separated by whitespace and
//! extra trailing fields are ignored.

use crate::IoError;
use isoviz_core::{ColorPoint, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Rendering parameters of one surface in a multi-surface scene
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceStyle {
    pub isovalue: f32,
    /// Lower gradient-magnitude bound kept on the surface
    pub gradient_min: f32,
    /// Upper gradient-magnitude bound kept on the surface
    pub gradient_max: f32,
    /// RGB in `[0, 1]`
    pub color: [f32; 3],
    pub opacity: f32,
}

/// Iterate over data lines as `(line number, fields)`
fn data_lines(text: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.starts_with('#'))
        .map(|(i, line)| (i + 1, line.split_whitespace().collect::<Vec<_>>()))
        .filter(|(_, fields)| !fields.is_empty())
}

fn field<T: FromStr>(fields: &[&str], index: usize, line: usize, what: &str) -> Result<T> {
    let raw = fields.get(index).ok_or_else(|| Error::Parse {
        line,
        message: format!("missing {}", what),
    })?;
    raw.parse().map_err(|_| Error::Parse {
        line,
        message: format!("invalid {} {:?}", what, raw),
    })
}

/// Integer channel over 255, clamped into `[0, 1]`
fn channel(fields: &[&str], index: usize, line: usize, what: &str) -> Result<f32> {
    let value: i64 = field(fields, index, line, what)?;
    Ok(value.clamp(0, 255) as f32 / 255.0)
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        let err = match e.kind() {
            std::io::ErrorKind::NotFound => IoError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => IoError::Io(e),
        };
        err.into()
    })
}

/// One isovalue per line
pub fn parse_isovalues(text: &str) -> Result<Vec<f32>> {
    data_lines(text)
        .map(|(line, fields)| field(&fields, 0, line, "isovalue"))
        .collect()
}

/// `value r g b` per line, channels as integers in `0..=255`
pub fn parse_color_ramp(text: &str) -> Result<Vec<ColorPoint>> {
    data_lines(text)
        .map(|(line, fields)| {
            Ok(ColorPoint::new(
                field(&fields, 0, line, "value")?,
                [
                    channel(&fields, 1, line, "red channel")?,
                    channel(&fields, 2, line, "green channel")?,
                    channel(&fields, 3, line, "blue channel")?,
                ],
            ))
        })
        .collect()
}

/// `isovalue gradMin gradMax r g b opacity` per line
pub fn parse_surface_styles(text: &str) -> Result<Vec<SurfaceStyle>> {
    data_lines(text)
        .map(|(line, fields)| {
            Ok(SurfaceStyle {
                isovalue: field(&fields, 0, line, "isovalue")?,
                gradient_min: field(&fields, 1, line, "gradient minimum")?,
                gradient_max: field(&fields, 2, line, "gradient maximum")?,
                color: [
                    channel(&fields, 3, line, "red channel")?,
                    channel(&fields, 4, line, "green channel")?,
                    channel(&fields, 5, line, "blue channel")?,
                ],
                opacity: field(&fields, 6, line, "opacity")?,
            })
        })
        .collect()
}

pub fn read_isovalues<P: AsRef<Path>>(path: P) -> Result<Vec<f32>> {
    parse_isovalues(&read_text(path.as_ref())?)
}

pub fn read_color_ramp<P: AsRef<Path>>(path: P) -> Result<Vec<ColorPoint>> {
    parse_color_ramp(&read_text(path.as_ref())?)
}

pub fn read_surface_styles<P: AsRef<Path>>(path: P) -> Result<Vec<SurfaceStyle>> {
    parse_surface_styles(&read_text(path.as_ref())?)
}
