use std::collections::{BTreeMap, BTreeSet};

use cinefilter::FieldValue;
use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 300.0;
            let hsl = Hsl::new(hue, 0.65, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Key colours: aggregate key → Color32
// ---------------------------------------------------------------------------

/// Assigns each key of an aggregate a colour. Keys are sorted first so a
/// key keeps its colour regardless of first-seen order in the dataset.
#[derive(Debug, Clone)]
pub struct KeyColors {
    mapping: BTreeMap<FieldValue, Color32>,
    default_color: Color32,
}

impl KeyColors {
    pub fn new<'a>(keys: impl IntoIterator<Item = &'a FieldValue>) -> Self {
        let sorted: BTreeSet<&FieldValue> = keys.into_iter().collect();
        let palette = generate_palette(sorted.len());
        let mapping = sorted
            .into_iter()
            .cloned()
            .zip(palette)
            .collect();

        KeyColors {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a key.
    pub fn color_for(&self, key: &FieldValue) -> Color32 {
        self.mapping
            .get(key)
            .copied()
            .unwrap_or(self.default_color)
    }
}
