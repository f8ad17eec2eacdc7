//! Horizontal color legend

use isoviz_core::ColorTransferFunction;

const BAR_WIDTH: f32 = 320.0;
const BAR_HEIGHT: f32 = 18.0;
const LABEL_HEIGHT: f32 = 16.0;
const SEGMENTS: usize = 64;

/// Legend for a color transfer function
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarBar {
    pub title: String,
    /// Number of evenly spaced value labels
    pub labels: usize,
    pub color_map: ColorTransferFunction,
}

impl ScalarBar {
    pub fn new(title: impl Into<String>, labels: usize, color_map: ColorTransferFunction) -> Self {
        Self {
            title: title.into(),
            labels,
            color_map,
        }
    }

    /// Value range covered by the bar
    pub fn range(&self) -> (f32, f32) {
        self.color_map.range().unwrap_or((0.0, 1.0))
    }

    /// Values at the label positions, first and last at the range ends
    pub fn label_values(&self) -> Vec<f32> {
        let (min, max) = self.range();
        match self.labels {
            0 => Vec::new(),
            1 => vec![min],
            n => (0..n)
                .map(|k| min + (max - min) * k as f32 / (n - 1) as f32)
                .collect(),
        }
    }

    pub fn label_texts(&self) -> Vec<String> {
        self.label_values()
            .into_iter()
            .map(|v| format!("{:4.0}", v))
            .collect()
    }

    /// Draw the legend centred at the bottom of the screen
    pub fn show(&self, ctx: &egui::Context) {
        egui::Area::new(egui::Id::new("scalar_bar"))
            .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -12.0))
            .interactable(false)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.label(
                        egui::RichText::new(&self.title)
                            .color(egui::Color32::WHITE)
                            .strong(),
                    );
                    let (rect, _) = ui.allocate_exact_size(
                        egui::vec2(BAR_WIDTH, BAR_HEIGHT + LABEL_HEIGHT),
                        egui::Sense::hover(),
                    );
                    self.paint(ui.painter(), rect);
                });
            });
    }

    fn paint(&self, painter: &egui::Painter, rect: egui::Rect) {
        let (min, max) = self.range();
        let segment = BAR_WIDTH / SEGMENTS as f32;

        for s in 0..SEGMENTS {
            let t = (s as f32 + 0.5) / SEGMENTS as f32;
            let [r, g, b] = self.color_map.map(min + (max - min) * t);
            let x = rect.left() + s as f32 * segment;
            painter.rect_filled(
                egui::Rect::from_min_size(
                    egui::pos2(x, rect.top()),
                    egui::vec2(segment + 0.5, BAR_HEIGHT),
                ),
                0.0,
                to_color32([r, g, b]),
            );
        }

        let texts = self.label_texts();
        let count = texts.len().max(2) - 1;
        for (k, text) in texts.into_iter().enumerate() {
            let x = rect.left() + BAR_WIDTH * k as f32 / count as f32;
            painter.text(
                egui::pos2(x, rect.top() + BAR_HEIGHT + 2.0),
                egui::Align2::CENTER_TOP,
                text,
                egui::FontId::proportional(12.0),
                egui::Color32::WHITE,
            );
        }
    }
}

fn to_color32(rgb: [f32; 3]) -> egui::Color32 {
    let [r, g, b] = rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    egui::Color32::from_rgb(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_span_color_range() {
        let bar = ScalarBar::new("Gradient Magnitude", 6, ColorTransferFunction::default_ramp(0.0, 100.0));
        assert_eq!(bar.label_values(), vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);
        assert_eq!(bar.label_texts()[1], "  20");
    }

    #[test]
    fn test_isovalue_bar_has_five_labels() {
        let bar = ScalarBar::new("Isovalue", 5, ColorTransferFunction::isovalue_ramp(0, 1200));
        let texts = bar.label_texts();
        assert_eq!(texts.len(), 5);
        assert_eq!(texts[0], "   0");
        assert_eq!(texts[4], "1200");
    }

    #[test]
    fn test_empty_map_defaults_to_unit_range() {
        let bar = ScalarBar::new("Empty", 2, ColorTransferFunction::new());
        assert_eq!(bar.range(), (0.0, 1.0));
    }

    #[test]
    fn test_color_conversion() {
        assert_eq!(to_color32([1.0, 0.0, 2.0]), egui::Color32::from_rgb(255, 0, 255));
    }
}
