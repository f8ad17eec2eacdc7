//! Slider controls

use isoviz_core::Axis;

/// The live parameter a slider drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Isovalue,
    GradientMin,
    GradientMax,
    Clip(Axis),
}

impl Control {
    pub fn title(self) -> &'static str {
        match self {
            Control::Isovalue => "Isovalue",
            Control::GradientMin => "Min Gradient Magnitude",
            Control::GradientMax => "Max Gradient Magnitude",
            Control::Clip(Axis::X) => "X",
            Control::Clip(Axis::Y) => "Y",
            Control::Clip(Axis::Z) => "Z",
        }
    }
}

/// A horizontal slider bound to a [`Control`]
#[derive(Debug, Clone, PartialEq)]
pub struct SliderSpec {
    pub control: Control,
    pub min: f32,
    pub max: f32,
    pub value: f32,
}

impl SliderSpec {
    /// The displayed value is clamped to `[min, max]`
    pub fn new(control: Control, min: f32, max: f32, value: f32) -> Self {
        let mut spec = Self {
            control,
            min,
            max,
            value,
        };
        spec.set_value(value);
        spec
    }

    /// Clip plane slider from 0 to one past the data bound
    pub fn clip(axis: Axis, bound_max: f32, value: f32) -> Self {
        Self::new(Control::Clip(axis), 0.0, (bound_max + 1.0).trunc(), value)
    }

    pub fn title(&self) -> &'static str {
        self.control.title()
    }

    pub fn set_value(&mut self, value: f32) {
        self.value = if self.min <= self.max {
            value.clamp(self.min, self.max)
        } else {
            value
        };
    }

    /// Value text shown next to the slider, e.g. `" 42 / 255"`
    pub fn label(&self) -> String {
        format!("{:3.0} / {}", self.value, self.max)
    }
}

/// X, Y and Z clip sliders for a volume whose upper bounds are `bound_max`
pub fn clip_sliders(bound_max: [f32; 3], offsets: [f32; 3]) -> Vec<SliderSpec> {
    Axis::ALL
        .iter()
        .map(|&axis| SliderSpec::clip(axis, bound_max[axis.index()], offsets[axis.index()]))
        .collect()
}
