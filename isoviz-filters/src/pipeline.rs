//! Demand-driven isosurface pipeline
//!
//! `contour -> probe -> clip x -> clip y -> clip z -> clip scalar min -> clip scalar max`
//!
//! Each stage caches its output. Changing a parameter drops the cache of the
//! stage it feeds and of everything downstream, so moving a clip slider does
//! not re-run marching cubes.

use crate::{clip_by_plane, clip_by_scalar, contour, ContourOptions};
use isoviz_core::{AxisClipPlanes, ClipRange, ImageVolume, Result, TriangleMesh};
use std::sync::Arc;
use std::time::Instant;

/// Configuration for an [`IsoPipeline`]
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Contour values, one surface each
    pub isovalues: Vec<f32>,
    /// Contouring options
    pub contour: ContourOptions,
    /// Axis clip offsets
    pub clip_planes: AxisClipPlanes,
    /// Scalar window applied after the plane clips
    pub scalar_clip: Option<ClipRange>,
}

/// A cached chain of filters producing one renderable surface
#[derive(Debug, Clone)]
pub struct IsoPipeline {
    volume: Arc<ImageVolume>,
    probe_source: Option<Arc<ImageVolume>>,
    config: PipelineConfig,
    surface: Option<TriangleMesh>,
    clipped: Option<TriangleMesh>,
    output: Option<TriangleMesh>,
}

impl IsoPipeline {
    /// Create a pipeline over `volume`; nothing is computed until [`update`](Self::update)
    pub fn new(volume: Arc<ImageVolume>, config: PipelineConfig) -> Self {
        Self {
            volume,
            probe_source: None,
            config,
            surface: None,
            clipped: None,
            output: None,
        }
    }

    /// Resample `source` onto the surface, replacing the contour scalars
    pub fn with_probe(mut self, source: Arc<ImageVolume>) -> Self {
        self.probe_source = Some(source);
        self.invalidate_surface();
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn volume(&self) -> &Arc<ImageVolume> {
        &self.volume
    }

    pub fn isovalues(&self) -> &[f32] {
        &self.config.isovalues
    }

    pub fn clip_planes(&self) -> AxisClipPlanes {
        self.config.clip_planes
    }

    pub fn scalar_clip(&self) -> Option<ClipRange> {
        self.config.scalar_clip
    }

    pub fn set_isovalues(&mut self, values: Vec<f32>) {
        if self.config.isovalues != values {
            self.config.isovalues = values;
            self.invalidate_surface();
        }
    }

    /// Replace all contour values with a single one
    pub fn set_isovalue(&mut self, value: f32) {
        self.set_isovalues(vec![value]);
    }

    pub fn set_clip_planes(&mut self, planes: AxisClipPlanes) {
        if self.config.clip_planes != planes {
            self.config.clip_planes = planes;
            self.clipped = None;
            self.output = None;
        }
    }

    pub fn set_scalar_clip(&mut self, range: Option<ClipRange>) {
        if self.config.scalar_clip != range {
            self.config.scalar_clip = range;
            self.output = None;
        }
    }

    /// Check if the next [`update`](Self::update) has work to do
    pub fn is_dirty(&self) -> bool {
        self.output.is_none()
    }

    /// Last computed output, without re-running anything
    pub fn output(&self) -> Option<&TriangleMesh> {
        self.output.as_ref()
    }

    fn invalidate_surface(&mut self) {
        self.surface = None;
        self.clipped = None;
        self.output = None;
    }

    /// Re-run the stages whose inputs changed and return the final mesh
    pub fn update(&mut self) -> Result<&TriangleMesh> {
        if self.surface.is_none() {
            let start = Instant::now();
            let mut surface = contour(&self.volume, &self.config.isovalues, self.config.contour)?;
            if let Some(source) = &self.probe_source {
                surface = crate::probe(&surface, source.as_ref());
            }
            log::debug!(
                "Surface stage: {} triangles in {:.2?}",
                surface.face_count(),
                start.elapsed()
            );
            self.surface = Some(surface);
        }

        if self.clipped.is_none() {
            let start = Instant::now();
            let mut mesh = self.surface.clone().unwrap_or_default();
            for plane in self.config.clip_planes.planes() {
                mesh = clip_by_plane(&mesh, &plane);
            }
            log::debug!(
                "Plane clip stage: {} triangles in {:.2?}",
                mesh.face_count(),
                start.elapsed()
            );
            self.clipped = Some(mesh);
        }

        if self.output.is_none() {
            let mesh = self.clipped.clone().unwrap_or_default();
            let mesh = match self.config.scalar_clip {
                Some(range) if mesh.scalars.is_some() => {
                    let above = clip_by_scalar(&mesh, range.min(), false)?;
                    clip_by_scalar(&above, range.max(), true)?
                }
                _ => mesh,
            };
            self.output = Some(mesh);
        }

        let output: &TriangleMesh = self.output.get_or_insert_with(TriangleMesh::new);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoviz_core::Point3f;

    fn ramp() -> Arc<ImageVolume> {
        Arc::new(ImageVolume::from_fn([5, 5, 5], Point3f::origin(), [1.0; 3], |p| p.z))
    }

    #[test]
    fn test_update_caches_until_changed() {
        let mut pipeline = IsoPipeline::new(
            ramp(),
            PipelineConfig {
                isovalues: vec![1.5],
                ..Default::default()
            },
        );
        assert!(pipeline.is_dirty());
        let faces = pipeline.update().unwrap().face_count();
        assert_eq!(faces, 32);
        assert!(!pipeline.is_dirty());

        pipeline.set_isovalue(1.5);
        assert!(!pipeline.is_dirty());

        pipeline.set_clip_planes(AxisClipPlanes::new(2.0, 0.0, 0.0));
        assert!(pipeline.is_dirty());
        let clipped = pipeline.update().unwrap();
        assert!(clipped.vertices.iter().all(|p| p.x >= 2.0 - 1e-6));
        assert_eq!(clipped.face_count(), 16);
    }

    #[test]
    fn test_probe_and_scalar_clip() {
        let gradient = Arc::new(ImageVolume::from_fn([5, 5, 5], Point3f::origin(), [1.0; 3], |p| p.x));
        let mut pipeline = IsoPipeline::new(
            ramp(),
            PipelineConfig {
                isovalues: vec![2.5],
                scalar_clip: Some(ClipRange::new(1.0, 3.0)),
                ..Default::default()
            },
        )
        .with_probe(gradient);

        let mesh = pipeline.update().unwrap();
        let (lo, hi) = mesh.scalar_range().unwrap();
        assert!(lo >= 1.0 - 1e-5 && hi <= 3.0 + 1e-5);
        assert!(mesh.vertices.iter().all(|p| p.x >= 1.0 - 1e-5 && p.x <= 3.0 + 1e-5));

        pipeline.set_scalar_clip(None);
        let (lo, hi) = pipeline.update().unwrap().scalar_range().unwrap();
        assert_eq!((lo, hi), (0.0, 4.0));
    }

    #[test]
    fn test_no_isovalues_is_empty() {
        let mut pipeline = IsoPipeline::new(ramp(), PipelineConfig::default());
        assert!(pipeline.update().unwrap().is_empty());
    }
}
