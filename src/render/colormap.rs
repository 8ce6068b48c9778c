//! Scalar-to-color mapping for field previews.

use serde::{Deserialize, Serialize};

/// Diverging cool-warm control points (blue → light gray → red).
const COOLWARM: [(f64, [f64; 3]); 5] = [
    (0.00, [59.0, 76.0, 192.0]),
    (0.25, [141.0, 176.0, 254.0]),
    (0.50, [221.0, 221.0, 221.0]),
    (0.75, [244.0, 154.0, 123.0]),
    (1.00, [180.0, 4.0, 38.0]),
];

/// Color used for non-finite samples.
const INVALID_COLOR: [u8; 3] = [0, 0, 0];

/// Available colormaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMap {
    #[default]
    Coolwarm,
    Grayscale,
}

impl ColorMap {
    /// Maps a normalized value in `[0, 1]` to RGB.
    pub fn rgb(self, t: f64) -> [u8; 3] {
        if !t.is_finite() {
            return INVALID_COLOR;
        }
        match self {
            ColorMap::Coolwarm => coolwarm(t),
            ColorMap::Grayscale => {
                let g = (t.clamp(0.0, 1.0) * 255.0).round() as u8;
                [g, g, g]
            }
        }
    }
}

/// Piecewise-linear cool-warm colormap.
pub fn coolwarm(t: f64) -> [u8; 3] {
    if !t.is_finite() {
        return INVALID_COLOR;
    }
    let t = t.clamp(0.0, 1.0);
    let upper = COOLWARM
        .iter()
        .position(|(stop, _)| *stop >= t)
        .unwrap_or(COOLWARM.len() - 1)
        .max(1);
    let (t0, c0) = COOLWARM[upper - 1];
    let (t1, c1) = COOLWARM[upper];
    let w = (t - t0) / (t1 - t0);

    let mut rgb = [0u8; 3];
    for (out, (a, b)) in rgb.iter_mut().zip(c0.iter().zip(c1.iter())) {
        *out = (a + (b - a) * w).round().clamp(0.0, 255.0) as u8;
    }
    rgb
}
