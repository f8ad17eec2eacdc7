//! Scene state shared between the slider callbacks and the renderer

use crate::{Control, ScalarBar, SliderSpec};
use isoviz_core::{AxisClipPlanes, ClipRange, ColorTransferFunction, Point3f, Result};
use isoviz_filters::IsoPipeline;
use isoviz_gpu::GpuMesh;

/// One rendered surface: a pipeline and how to color its output
#[derive(Debug, Clone)]
pub struct SurfaceLayer {
    pub pipeline: IsoPipeline,
    pub color_map: ColorTransferFunction,
    pub opacity: f32,
}

impl SurfaceLayer {
    pub fn new(pipeline: IsoPipeline, color_map: ColorTransferFunction) -> Self {
        Self {
            pipeline,
            color_map,
            opacity: 1.0,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Colored triangles of the last pipeline output
    pub fn gpu_mesh(&self) -> GpuMesh {
        let Some(mesh) = self.pipeline.output() else {
            return GpuMesh::default();
        };
        let fallback = self
            .color_map
            .points()
            .first()
            .map(|p| p.rgb)
            .unwrap_or([1.0; 3]);
        GpuMesh::from_triangle_mesh(
            mesh,
            |i| match mesh.scalar(i) {
                Some(s) if !self.color_map.is_empty() => self.color_map.map(s),
                _ => fallback,
            },
            self.opacity,
        )
    }
}

/// Everything the sliders mutate, plus the layers those changes feed
#[derive(Debug, Clone)]
pub struct SceneState {
    pub layers: Vec<SurfaceLayer>,
    pub sliders: Vec<SliderSpec>,
    pub scalar_bar: Option<ScalarBar>,
    clip_planes: AxisClipPlanes,
    gradient_range: Option<ClipRange>,
    bounds: (Point3f, Point3f),
}

impl SceneState {
    /// Create a scene over data with world bounds `bounds`.
    ///
    /// The layers keep their own clip configuration until a slider changes it.
    pub fn new(layers: Vec<SurfaceLayer>, bounds: (Point3f, Point3f)) -> Self {
        let clip_planes = layers
            .first()
            .map(|l| l.pipeline.clip_planes())
            .unwrap_or_default();
        Self {
            layers,
            sliders: Vec::new(),
            scalar_bar: None,
            clip_planes,
            gradient_range: None,
            bounds,
        }
    }

    pub fn with_sliders(mut self, sliders: Vec<SliderSpec>) -> Self {
        self.sliders = sliders;
        self
    }

    pub fn with_scalar_bar(mut self, scalar_bar: ScalarBar) -> Self {
        self.scalar_bar = Some(scalar_bar);
        self
    }

    /// Gradient window driven by the min/max sliders
    pub fn with_gradient_range(mut self, range: ClipRange) -> Self {
        self.gradient_range = Some(range);
        self
    }

    pub fn bounds(&self) -> (Point3f, Point3f) {
        self.bounds
    }

    pub fn clip_planes(&self) -> AxisClipPlanes {
        self.clip_planes
    }

    pub fn gradient_range(&self) -> Option<ClipRange> {
        self.gradient_range
    }

    pub fn slider(&self, control: Control) -> Option<&SliderSpec> {
        self.sliders.iter().find(|s| s.control == control)
    }

    /// Feed a slider value into the scene.
    ///
    /// Returns the value the slider must show afterwards. It differs from
    /// `value` only when a gradient bound crossed the other one and was
    /// snapped back.
    pub fn apply(&mut self, control: Control, value: f32) -> f32 {
        let applied = match control {
            Control::Isovalue => {
                for layer in &mut self.layers {
                    layer.pipeline.set_isovalue(value);
                }
                value
            }
            Control::GradientMin | Control::GradientMax => {
                let Some(range) = self.gradient_range.as_mut() else {
                    log::warn!("{} slider without a gradient range", control.title());
                    return value;
                };
                let update = if control == Control::GradientMin {
                    range.set_min(value)
                } else {
                    range.set_max(value)
                };
                if update.corrected {
                    log::debug!("{} snapped to {}", control.title(), update.applied);
                }
                let range = *range;
                for layer in &mut self.layers {
                    layer.pipeline.set_scalar_clip(Some(range));
                }
                update.applied
            }
            Control::Clip(axis) => {
                self.clip_planes.set(axis, value);
                for layer in &mut self.layers {
                    layer.pipeline.set_clip_planes(self.clip_planes);
                }
                value
            }
        };

        if let Some(slider) = self.sliders.iter_mut().find(|s| s.control == control) {
            slider.set_value(applied);
        }
        applied
    }

    /// Check if any layer needs re-running
    pub fn is_dirty(&self) -> bool {
        self.layers.iter().any(|l| l.pipeline.is_dirty())
    }

    /// Re-run dirty pipelines; true when any output changed
    pub fn update(&mut self) -> Result<bool> {
        let mut changed = false;
        for layer in &mut self.layers {
            if layer.pipeline.is_dirty() {
                let mesh = layer.pipeline.update()?;
                log::debug!(
                    "Layer updated: {} vertices, {} triangles",
                    mesh.vertex_count(),
                    mesh.face_count()
                );
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Colored triangles of every layer, in layer order
    pub fn gpu_meshes(&self) -> Vec<GpuMesh> {
        self.layers.iter().map(SurfaceLayer::gpu_mesh).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoviz_core::{Axis, ImageVolume, RED};
    use isoviz_filters::PipelineConfig;
    use std::sync::Arc;

    /// 5x5x5 volume whose value is z, with a probe source equal to x
    fn scene() -> SceneState {
        let volume = Arc::new(ImageVolume::from_fn([5, 5, 5], Point3f::origin(), [1.0; 3], |p| p.z));
        let probe = Arc::new(ImageVolume::from_fn([5, 5, 5], Point3f::origin(), [1.0; 3], |p| p.x));
        let range = ClipRange::new(0.0, 4.0);
        let pipeline = IsoPipeline::new(
            volume.clone(),
            PipelineConfig {
                isovalues: vec![2.5],
                scalar_clip: Some(range),
                ..Default::default()
            },
        )
        .with_probe(probe);

        SceneState::new(
            vec![SurfaceLayer::new(pipeline, ColorTransferFunction::default_ramp(0.0, 4.0))],
            volume.bounds(),
        )
        .with_gradient_range(range)
        .with_sliders(vec![
            SliderSpec::new(Control::Isovalue, 0.0, 4.0, 2.5),
            SliderSpec::new(Control::GradientMin, 0.0, 4.0, 0.0),
            SliderSpec::new(Control::GradientMax, 0.0, 4.0, 4.0),
            SliderSpec::clip(Axis::X, 4.0, 0.0),
        ])
    }

    #[test]
    fn test_gradient_sliders_keep_min_below_max() {
        let mut scene = scene();
        assert_eq!(scene.apply(Control::GradientMax, 3.0), 3.0);

        // Crossing the max snaps the min one unit below it
        assert_eq!(scene.apply(Control::GradientMin, 3.5), 2.0);
        assert_eq!(scene.slider(Control::GradientMin).unwrap().value, 2.0);

        assert_eq!(scene.apply(Control::GradientMax, 1.0), 3.0);
        let range = scene.gradient_range().unwrap();
        assert!(range.min() < range.max());
        assert_eq!(scene.layers[0].pipeline.scalar_clip(), Some(range));
    }

    #[test]
    fn test_clip_slider_updates_pipeline() {
        let mut scene = scene();
        assert!(scene.update().unwrap());
        assert!(!scene.update().unwrap());

        scene.apply(Control::Clip(Axis::X), 2.0);
        assert_eq!(scene.clip_planes().x, 2.0);
        assert!(scene.is_dirty());
        assert!(scene.update().unwrap());

        let mesh = scene.layers[0].pipeline.output().unwrap();
        assert!(!mesh.is_empty());
        assert!(mesh.vertices.iter().all(|p| p.x >= 2.0 - 1e-5));
    }

    #[test]
    fn test_isovalue_slider_moves_surface() {
        let mut scene = scene();
        scene.apply(Control::Isovalue, 1.5);
        scene.update().unwrap();
        let mesh = scene.layers[0].pipeline.output().unwrap();
        assert!(!mesh.is_empty());
        assert!(mesh.vertices.iter().all(|p| (p.z - 1.5).abs() < 1e-5));
    }

    #[test]
    fn test_gpu_meshes_use_color_map() {
        let mut scene = scene();
        scene.update().unwrap();
        let meshes = scene.gpu_meshes();
        assert_eq!(meshes.len(), 1);

        // Probed x = 0 maps to the first (black) stop of the ramp
        let mesh = scene.layers[0].pipeline.output().unwrap();
        let i = mesh.vertices.iter().position(|p| p.x == 0.0).unwrap();
        assert_eq!(meshes[0].vertices[i].color, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_constant_layer_is_translucent() {
        let volume = Arc::new(ImageVolume::from_fn([3, 3, 3], Point3f::origin(), [1.0; 3], |p| p.y));
        let mut layer = SurfaceLayer::new(
            IsoPipeline::new(
                volume,
                PipelineConfig {
                    isovalues: vec![0.5],
                    ..Default::default()
                },
            ),
            ColorTransferFunction::constant(0.0, 1.0, RED),
        )
        .with_opacity(0.4);
        layer.pipeline.update().unwrap();

        let gpu = layer.gpu_mesh();
        assert!(gpu.is_translucent());
        assert!(gpu.vertices.iter().all(|v| v.color == [1.0, 0.0, 0.0, 0.4]));
    }
}
