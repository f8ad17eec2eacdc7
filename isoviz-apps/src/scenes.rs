//! Scene composition for each program

use isoviz_core::{
    AxisClipPlanes, ClipRange, ColorPoint, ColorTransferFunction, Drawable, ImageVolume,
};
use isoviz_filters::{IsoPipeline, PipelineConfig};
use isoviz_io::SurfaceStyle;
use isoviz_visualization::{
    clip_sliders, Control, ScalarBar, SceneState, SliderSpec, SurfaceLayer,
};
use std::sync::Arc;

/// Integer midpoint of a scalar range: `(trunc(min) + trunc(max)) div 2`
pub fn midpoint_isovalue(range: (f32, f32)) -> f32 {
    let (min, max) = truncated(range);
    (min + max).div_euclid(2) as f32
}

fn truncated((min, max): (f32, f32)) -> (i64, i64) {
    (min.trunc() as i64, max.trunc() as i64)
}

fn clip_planes(offsets: [f32; 3]) -> AxisClipPlanes {
    AxisClipPlanes::new(offsets[0], offsets[1], offsets[2])
}

fn bound_max(volume: &ImageVolume) -> [f32; 3] {
    let (_, max) = volume.bounding_box();
    [max.x, max.y, max.z]
}

/// Isovalue slider over the truncated data range
fn isovalue_slider(data: &ImageVolume, isovalue: f32) -> SliderSpec {
    let (min, max) = truncated(data.scalar_range());
    SliderSpec::new(Control::Isovalue, min as f32, max as f32, isovalue)
}

/// Initial gradient window and its two sliders.
///
/// Both sliders span `[min_grad, trunc(max_grad)]`; the window starts at the
/// truncated gradient range.
pub fn gradient_controls(gradient_range: (f32, f32)) -> (ClipRange, [SliderSpec; 2]) {
    let (min_grad, max_grad) = gradient_range;
    let (lo, hi) = truncated(gradient_range);
    let range = ClipRange::new(lo as f32, hi as f32);
    let slider_max = max_grad.trunc();
    (
        range,
        [
            SliderSpec::new(Control::GradientMin, min_grad, slider_max, range.min()),
            SliderSpec::new(Control::GradientMax, min_grad, slider_max, range.max()),
        ],
    )
}

/// One surface colored by its isovalue, with an isovalue slider
pub fn isosurface_scene(
    data: Arc<ImageVolume>,
    isovalue: Option<f32>,
    clip: [f32; 3],
) -> SceneState {
    let data_range = data.scalar_range();
    let isovalue = isovalue.unwrap_or_else(|| midpoint_isovalue(data_range));
    let (min, max) = truncated(data_range);
    let color_map = ColorTransferFunction::isovalue_ramp(min, max);

    let pipeline = IsoPipeline::new(
        data.clone(),
        PipelineConfig {
            isovalues: vec![isovalue],
            clip_planes: clip_planes(clip),
            ..Default::default()
        },
    );

    let mut sliders = vec![isovalue_slider(&data, isovalue)];
    sliders.extend(clip_sliders(bound_max(&data), clip));

    SceneState::new(
        vec![SurfaceLayer::new(pipeline, color_map.clone())],
        data.bounds(),
    )
    .with_sliders(sliders)
    .with_scalar_bar(ScalarBar::new("Isovalue", 5, color_map))
}

/// One surface colored by gradient magnitude and windowed by it
pub fn gradient_scene(
    data: Arc<ImageVolume>,
    gradient: Arc<ImageVolume>,
    isovalue: Option<f32>,
    clip: [f32; 3],
) -> SceneState {
    let isovalue = isovalue.unwrap_or_else(|| midpoint_isovalue(data.scalar_range()));
    let gradient_range = gradient.scalar_range();
    let (window, gradient_sliders) = gradient_controls(gradient_range);
    let color_map = ColorTransferFunction::default_ramp(gradient_range.0, gradient_range.1);

    let pipeline = IsoPipeline::new(
        data.clone(),
        PipelineConfig {
            isovalues: vec![isovalue],
            clip_planes: clip_planes(clip),
            scalar_clip: Some(window),
            ..Default::default()
        },
    )
    .with_probe(gradient);

    let mut sliders = vec![isovalue_slider(&data, isovalue)];
    sliders.extend(gradient_sliders);
    sliders.extend(clip_sliders(bound_max(&data), clip));

    SceneState::new(
        vec![SurfaceLayer::new(pipeline, color_map.clone())],
        data.bounds(),
    )
    .with_gradient_range(window)
    .with_sliders(sliders)
    .with_scalar_bar(ScalarBar::new("Gradient Magnitude", 6, color_map))
}

/// Several isovalues in one surface colored through a gradient ramp.
///
/// An empty `color_points` list falls back to the default ramp over the
/// gradient range.
pub fn transfer_function_scene(
    data: Arc<ImageVolume>,
    gradient: Arc<ImageVolume>,
    isovalues: Vec<f32>,
    color_points: Vec<ColorPoint>,
    clip: [f32; 3],
) -> SceneState {
    let color_map = if color_points.is_empty() {
        let (min, max) = gradient.scalar_range();
        ColorTransferFunction::default_ramp(min, max)
    } else {
        ColorTransferFunction::from_points(color_points)
    };

    let pipeline = IsoPipeline::new(
        data.clone(),
        PipelineConfig {
            isovalues,
            clip_planes: clip_planes(clip),
            ..Default::default()
        },
    )
    .with_probe(gradient);

    SceneState::new(
        vec![SurfaceLayer::new(pipeline, color_map.clone())],
        data.bounds(),
    )
    .with_sliders(clip_sliders(bound_max(&data), clip))
    .with_scalar_bar(ScalarBar::new("Gradient Magnitude", 6, color_map))
}

/// One flat-colored, possibly translucent surface per style record
pub fn styled_scene(
    data: Arc<ImageVolume>,
    gradient: Arc<ImageVolume>,
    styles: &[SurfaceStyle],
    clip: [f32; 3],
) -> SceneState {
    let layers = styles
        .iter()
        .map(|style| {
            let window = ClipRange::new(style.gradient_min, style.gradient_max);
            let pipeline = IsoPipeline::new(
                data.clone(),
                PipelineConfig {
                    isovalues: vec![style.isovalue],
                    clip_planes: clip_planes(clip),
                    scalar_clip: Some(window),
                    ..Default::default()
                },
            )
            .with_probe(gradient.clone());
            let color_map =
                ColorTransferFunction::constant(style.gradient_min, style.gradient_max, style.color);
            SurfaceLayer::new(pipeline, color_map).with_opacity(style.opacity)
        })
        .collect();

    SceneState::new(layers, data.bounds()).with_sliders(clip_sliders(bound_max(&data), clip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use isoviz_core::{Axis, Point3f};

    /// 11x11x12 volumes: data is 100·z, gradient is 2.5·x
    fn volumes() -> (Arc<ImageVolume>, Arc<ImageVolume>) {
        let dims = [11, 11, 12];
        let data = ImageVolume::from_fn(dims, Point3f::origin(), [1.0; 3], |p| p.z * 100.0);
        let gradient = ImageVolume::from_fn(dims, Point3f::origin(), [1.0; 3], |p| p.x * 2.5);
        (Arc::new(data), Arc::new(gradient))
    }

    #[test]
    fn test_midpoint_isovalue() {
        assert_eq!(midpoint_isovalue((0.0, 1000.0)), 500.0);
        assert_eq!(midpoint_isovalue((0.9, 5.7)), 2.0);
        assert_eq!(midpoint_isovalue((-3.5, 0.0)), -2.0);
    }

    #[test]
    fn test_gradient_controls() {
        let (range, [min, max]) = gradient_controls((0.4, 87.9));
        assert_eq!((range.min(), range.max()), (0.0, 87.0));
        assert_eq!((min.min, min.max), (0.4, 87.0));
        assert_eq!(min.value, 0.4);
        assert_eq!(max.value, 87.0);

        // A flat gradient still yields a valid window
        let (range, _) = gradient_controls((3.2, 3.8));
        assert!(range.min() < range.max());
    }

    #[test]
    fn test_isosurface_scene() {
        let (data, _) = volumes();
        let mut scene = isosurface_scene(data, None, [0.0, 0.0, 0.0]);

        let titles: Vec<&str> = scene.sliders.iter().map(|s| s.title()).collect();
        assert_eq!(titles, vec!["Isovalue", "X", "Y", "Z"]);
        let iso = scene.slider(Control::Isovalue).unwrap();
        assert_eq!((iso.min, iso.max, iso.value), (0.0, 1100.0, 550.0));
        assert_eq!(scene.slider(Control::Clip(Axis::X)).unwrap().max, 11.0);
        assert_eq!(scene.slider(Control::Clip(Axis::Z)).unwrap().max, 12.0);

        let bar = scene.scalar_bar.clone().unwrap();
        assert_eq!((bar.title.as_str(), bar.labels), ("Isovalue", 5));

        assert!(scene.update().unwrap());
        let mesh = scene.layers[0].pipeline.output().unwrap();
        assert!(!mesh.is_empty());
        assert!(mesh.vertices.iter().all(|p| (p.z - 5.5).abs() < 1e-4));
    }

    #[test]
    fn test_gradient_scene_windows_surface() {
        let (data, gradient) = volumes();
        let mut scene = gradient_scene(data, gradient, Some(450.0), [0.0; 3]);

        let titles: Vec<&str> = scene.sliders.iter().map(|s| s.title()).collect();
        assert_eq!(
            titles,
            vec!["Isovalue", "Min Gradient Magnitude", "Max Gradient Magnitude", "X", "Y", "Z"]
        );

        scene.apply(Control::GradientMin, 5.0);
        scene.apply(Control::GradientMax, 20.0);
        scene.update().unwrap();

        // Probed gradient is 2.5·x, so the window keeps 2 <= x <= 8
        let mesh = scene.layers[0].pipeline.output().unwrap();
        assert!(!mesh.is_empty());
        for p in &mesh.vertices {
            assert!(p.x >= 2.0 - 1e-4 && p.x <= 8.0 + 1e-4);
            assert_relative_eq!(p.z, 4.5, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_transfer_function_scene_default_ramp() {
        let (data, gradient) = volumes();
        let mut scene =
            transfer_function_scene(data, gradient, vec![250.0, 750.0], Vec::new(), [0.0; 3]);
        assert_eq!(scene.sliders.len(), 3);

        let bar = scene.scalar_bar.clone().unwrap();
        assert_eq!(bar.color_map.points().len(), 6);
        assert_eq!(bar.range(), (0.0, 25.0));

        scene.update().unwrap();
        let mesh = scene.layers[0].pipeline.output().unwrap();
        assert!(mesh.vertices.iter().any(|p| (p.z - 2.5).abs() < 1e-4));
        assert!(mesh.vertices.iter().any(|p| (p.z - 7.5).abs() < 1e-4));
    }

    #[test]
    fn test_styled_scene_layers() {
        let (data, gradient) = volumes();
        let styles = [
            SurfaceStyle {
                isovalue: 250.0,
                gradient_min: 0.0,
                gradient_max: 30.0,
                color: [1.0, 0.0, 0.0],
                opacity: 1.0,
            },
            SurfaceStyle {
                isovalue: 650.0,
                gradient_min: 10.0,
                gradient_max: 30.0,
                color: [0.0, 0.0, 1.0],
                opacity: 0.3,
            },
        ];
        let mut scene = styled_scene(data, gradient, &styles, [0.0; 3]);
        assert!(scene.scalar_bar.is_none());
        assert_eq!(scene.sliders.len(), 3);

        scene.update().unwrap();
        let meshes = scene.gpu_meshes();
        assert_eq!(meshes.len(), 2);
        assert!(!meshes[0].is_translucent());
        assert!(meshes[1].is_translucent());
        assert!(meshes[1].vertices.iter().all(|v| v.color == [0.0, 0.0, 1.0, 0.3]));

        let back = scene.layers[1].pipeline.output().unwrap();
        assert!(back.vertices.iter().all(|p| p.x >= 4.0 - 1e-4));
    }
}
