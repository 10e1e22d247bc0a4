//! Intensity color ramp for heatmap cells

/// Background drawn behind cells below the visibility threshold
pub const BACKGROUND_DARK: &str = "#13141b";
/// Fill of cells below the visibility threshold
pub const BACKGROUND_CELL: &str = "#262738";
/// Intensities below this are drawn as background
pub const VISIBILITY_THRESHOLD: f64 = 0.05;
/// Peak cell opacity at intensity 1
pub const MAX_CELL_OPACITY: f64 = 0.35;

/// Upper bounds and colors of the purple ramp, light to dark
const RAMP: [(f64, &str); 9] = [
    (0.1, "#f7f0ff"),
    (0.2, "#e9d9ff"),
    (0.3, "#d4b4ff"),
    (0.4, "#b78eff"),
    (0.5, "#9c6bff"),
    (0.6, "#804aff"),
    (0.7, "#6933f5"),
    (0.8, "#5626dc"),
    (0.9, "#4520b5"),
];
const RAMP_TOP: &str = "#361d86";

fn visible(intensity: f64) -> bool {
    intensity.is_finite() && intensity >= VISIBILITY_THRESHOLD
}

fn ramp(intensity: f64) -> &'static str {
    RAMP.iter()
        .find(|(upper, _)| intensity < *upper)
        .map_or(RAMP_TOP, |(_, color)| *color)
}

/// Fill color for an intensity in `[0, 1]`
///
/// Non-finite intensities are treated as invisible.
pub fn intensity_color(intensity: f64) -> &'static str {
    if visible(intensity) { ramp(intensity) } else { BACKGROUND_CELL }
}

/// Background color for a cell, dark below the visibility threshold
pub fn cell_background(intensity: f64) -> &'static str {
    if visible(intensity) { ramp(intensity) } else { BACKGROUND_DARK }
}

/// Fill opacity of a cell
pub fn cell_opacity(intensity: f64) -> f64 {
    if intensity.is_finite() {
        intensity.clamp(0.0, 1.0) * MAX_CELL_OPACITY
    } else {
        0.0
    }
}
