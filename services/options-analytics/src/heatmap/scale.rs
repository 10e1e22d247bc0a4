//! Linear scales between data space and pixel space

use serde::{Deserialize, Serialize};

/// Affine map from a data interval onto a pixel interval
///
/// The range may be inverted (`range.0 > range.1`) for a y axis that grows
/// downward. A collapsed domain maps everything to the middle of the range.
/// A clamped scale keeps outputs inside the target interval in both
/// directions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
    clamp: bool,
}

impl LinearScale {
    /// Create an unclamped scale
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self {
            domain,
            range,
            clamp: false,
        }
    }

    /// Same scale with clamping enabled
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.clamp = true;
        self
    }

    /// Data interval
    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// Pixel interval
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Data value to pixel
    pub fn map(&self, value: f64) -> f64 {
        let t = self.bound(normalize(value, self.domain));
        self.range.0 + t * (self.range.1 - self.range.0)
    }

    /// Pixel to data value
    pub fn invert(&self, pixel: f64) -> f64 {
        let t = self.bound(normalize(pixel, self.range));
        self.domain.0 + t * (self.domain.1 - self.domain.0)
    }

    fn bound(&self, t: f64) -> f64 {
        if self.clamp { t.clamp(0.0, 1.0) } else { t }
    }
}

fn normalize(value: f64, (a, b): (f64, f64)) -> f64 {
    let span = b - a;
    if span == 0.0 {
        0.5
    } else {
        (value - a) / span
    }
}
