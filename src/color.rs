use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::QuestionKind;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let hsl = Hsl::new(hue, saturation, lightness);
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.green.clamp(0.0, 1.0) * 255.0) as u8,
        (rgb.blue.clamp(0.0, 1.0) * 255.0) as u8,
    )
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| hsl_to_color32((i as f32 / n as f32) * 360.0, 0.75, 0.55))
        .collect()
}

/// Green scale for heatmap cells and bar gradients: `t` in `[0, 1]`,
/// light for low values, dark for high ones.
pub fn green_scale(t: f32) -> Color32 {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    hsl_to_color32(125.0, 0.55, 0.92 - 0.72 * t)
}

/// Fixed colour per question kind, so every pie uses the same mapping.
pub fn kind_color(kind: QuestionKind) -> Color32 {
    match kind {
        QuestionKind::Computational => Color32::from_rgb(0x0c, 0x3d, 0x0e),
        QuestionKind::Conceptual => Color32::from_rgb(0xf5, 0xac, 0x19),
        QuestionKind::Mixed | QuestionKind::Unknown => Color32::from_rgb(0xed, 0x3d, 0x00),
    }
}

// ---------------------------------------------------------------------------
// Color mapping: category label → Color32
// ---------------------------------------------------------------------------

/// Maps the category labels of a chart to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from the labels, in the given order.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let palette = generate_palette(labels.len());
        let mapping: BTreeMap<String, Color32> = labels.into_iter().zip(palette).collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given label.
    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colours_are_distinct() {
        let palette = generate_palette(5);
        assert_eq!(palette.len(), 5);
        for (i, a) in palette.iter().enumerate() {
            for b in &palette[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn green_scale_darkens_with_value() {
        let low = green_scale(0.0);
        let high = green_scale(1.0);
        assert!(high.g() < low.g());
        assert_eq!(green_scale(f32::NAN), low);
    }

    #[test]
    fn color_map_falls_back_to_gray() {
        let map = ColorMap::new(["Mecânica", "Óptica"]);
        assert_ne!(map.color_for("Mecânica"), map.color_for("Óptica"));
        assert_eq!(map.color_for("Termofísica"), Color32::GRAY);
    }
}
