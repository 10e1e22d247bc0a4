//! Spatial heatmap over strike x premium space
//!
//! Computes padded axis domains covering every point and the spot band, then
//! samples a `rows x cols` grid over the drawable area. Each cell records the
//! nearest point to its center and an intensity that falls off linearly with
//! the distance to it.
//!
//! Pixel coordinates are relative to the top-left corner of the drawable area
//! (the viewport minus its margins). Row 0 is the top row, i.e. the highest
//! premiums.

pub mod index;
pub mod overlay;
pub mod palette;
pub mod scale;

use crate::config::HeatmapConfig;
use crate::contract::HeatPoint;
use scale::LinearScale;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// GEOMETRY
// ============================================================================

/// Space reserved around the drawable area, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    /// Top margin
    pub top: f64,
    /// Right margin
    pub right: f64,
    /// Bottom margin
    pub bottom: f64,
    /// Left margin
    pub left: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            top: 60.0,
            right: 60.0,
            bottom: 80.0,
            left: 80.0,
        }
    }
}

/// Rendering surface size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Total width in pixels
    pub width: f64,
    /// Total height in pixels
    pub height: f64,
    /// Margins around the drawable area
    #[serde(default)]
    pub margins: Margins,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(960.0, 600.0)
    }
}

impl Viewport {
    /// Viewport with default margins
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            margins: Margins::default(),
        }
    }

    /// Width of the drawable area
    pub fn inner_width(&self) -> f64 {
        self.width - self.margins.left - self.margins.right
    }

    /// Height of the drawable area
    pub fn inner_height(&self) -> f64 {
        self.height - self.margins.top - self.margins.bottom
    }

    /// True when nothing can be drawn
    pub fn is_empty(&self) -> bool {
        let (w, h) = (self.inner_width(), self.inner_height());
        !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0)
    }
}

/// Grid resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridResolution {
    /// Cells across
    pub cols: usize,
    /// Cells down
    pub rows: usize,
}

impl GridResolution {
    /// Resolution from configuration
    pub fn from_config(config: &HeatmapConfig) -> Self {
        Self {
            cols: config.cols,
            rows: config.rows,
        }
    }
}

/// Closed interval on one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisDomain {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
}

impl AxisDomain {
    /// Create a domain
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `max - min`
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Whether `value` lies inside the interval
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// True when the interval has no usable width
    pub fn is_degenerate(&self) -> bool {
        let span = self.span();
        !(span.is_finite() && span > 0.0)
    }

    /// `(min, max)`
    pub fn as_tuple(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Why a heatmap cannot be drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateReason {
    /// No point with finite coordinates
    NoPoints,
    /// Viewport leaves no drawable area
    EmptyViewport,
    /// Resolution has zero rows or columns
    EmptyGrid,
    /// Strike domain has no width
    CollapsedStrikeDomain,
    /// Premium domain has no width
    CollapsedPremiumDomain,
}

/// Whether grid and overlays may be drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum HeatmapStatus {
    /// Domains and viewport are usable
    Drawable,
    /// Grid is all zero and overlays must be skipped
    Degenerate(DegenerateReason),
}

/// One grid cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", bound = "P: Serialize")]
pub struct HeatmapCell<'a, P> {
    /// Proximity intensity in `[0, 1]`
    pub intensity: f64,
    /// Nearest point to the cell center
    pub nearest: Option<&'a P>,
    /// Index of the nearest point in the input
    pub nearest_index: Option<usize>,
}

impl<P> HeatmapCell<'_, P> {
    fn empty() -> Self {
        Self {
            intensity: 0.0,
            nearest: None,
            nearest_index: None,
        }
    }
}

/// Row-major grid of cells
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(bound = "P: Serialize")]
pub struct HeatmapGrid<'a, P> {
    /// Rows
    pub rows: usize,
    /// Columns
    pub cols: usize,
    /// `rows x cols` cells, row 0 first
    pub cells: Vec<HeatmapCell<'a, P>>,
}

impl<'a, P> HeatmapGrid<'a, P> {
    fn empty(resolution: GridResolution) -> Self {
        Self {
            rows: resolution.rows,
            cols: resolution.cols,
            cells: (0..resolution.rows * resolution.cols)
                .map(|_| HeatmapCell::empty())
                .collect(),
        }
    }

    /// Cell at `(row, col)`
    pub fn cell(&self, row: usize, col: usize) -> Option<&HeatmapCell<'a, P>> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col)
    }

    /// Highest intensity in the grid
    pub fn max_intensity(&self) -> f64 {
        self.cells.iter().map(|c| c.intensity).fold(0.0, f64::max)
    }
}

/// Heatmap with its domains and draw status
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", bound = "P: Serialize")]
pub struct Heatmap<'a, P> {
    /// Intensity grid
    pub grid: HeatmapGrid<'a, P>,
    /// Strike axis
    pub strike_domain: AxisDomain,
    /// Premium axis, always starting at zero
    pub premium_domain: AxisDomain,
    /// Draw status
    pub status: HeatmapStatus,
    /// Viewport the grid was sampled for
    pub viewport: Viewport,
}

impl<P> Heatmap<'_, P> {
    /// True when grid and overlays may be drawn
    pub fn is_drawable(&self) -> bool {
        self.status == HeatmapStatus::Drawable
    }

    /// Strike to pixel x
    pub fn strike_scale(&self) -> LinearScale {
        LinearScale::new(self.strike_domain.as_tuple(), (0.0, self.viewport.inner_width()))
            .clamped()
    }

    /// Premium to pixel y, zero premium at the bottom
    pub fn premium_scale(&self) -> LinearScale {
        LinearScale::new(self.premium_domain.as_tuple(), (self.viewport.inner_height(), 0.0))
            .clamped()
    }

    /// Size of one cell in pixels
    pub fn cell_size(&self) -> (f64, f64) {
        (
            self.viewport.inner_width() / self.grid.cols.max(1) as f64,
            self.viewport.inner_height() / self.grid.rows.max(1) as f64,
        )
    }

    /// Pixel center of a cell
    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let (w, h) = self.cell_size();
        ((col as f64 + 0.5) * w, (row as f64 + 0.5) * h)
    }

    /// Data-space `(strike, premium)` at the center of a cell
    pub fn cell_center_data(&self, row: usize, col: usize) -> (f64, f64) {
        let (px, py) = self.cell_center(row, col);
        (self.strike_scale().invert(px), self.premium_scale().invert(py))
    }
}

// ============================================================================
// COMPUTE
// ============================================================================

fn usable<P: HeatPoint>(point: &P) -> bool {
    point.strike().is_finite() && point.premium().is_finite()
}

/// Strike and premium domains for a point set and spot
///
/// Without usable points both axes take their fallback intervals. Otherwise
/// strikes are padded and widened to the spot band, and premiums run from
/// zero to the maximum plus headroom.
pub fn compute_domains<P: HeatPoint>(
    points: &[P],
    spot: f64,
    config: &HeatmapConfig,
) -> (AxisDomain, AxisDomain) {
    let mut extent: Option<(f64, f64, f64)> = None;
    for point in points.iter().filter(|p| usable(*p)) {
        let (s, m) = (point.strike(), point.premium());
        extent = Some(match extent {
            None => (s, s, m),
            Some((lo, hi, top)) => (lo.min(s), hi.max(s), top.max(m)),
        });
    }

    let Some((min_strike, max_strike, max_premium)) = extent else {
        let (s0, s1) = config.fallback_strike_domain;
        let (p0, p1) = config.fallback_premium_domain;
        return (AxisDomain::new(s0, s1), AxisDomain::new(p0, p1));
    };

    let range = max_strike - min_strike;
    let padding = if range == 0.0 {
        (max_strike.abs() * config.flat_strike_pad_ratio).max(config.flat_strike_pad_min)
    } else {
        (range * config.strike_pad_ratio).max(config.strike_pad_min)
    };
    let mut strike = AxisDomain::new(min_strike - padding, max_strike + padding);
    if spot.is_finite() {
        strike.min = strike.min.min(spot * (1.0 - config.spot_band));
        strike.max = strike.max.max(spot * (1.0 + config.spot_band));
    }

    let premium_max = if max_premium > 0.0 {
        max_premium * config.premium_headroom
    } else {
        config.fallback_premium_domain.1
    };

    (strike, AxisDomain::new(0.0, premium_max))
}

/// Sample the proximity heatmap for a point set
///
/// Never fails: empty input, an empty viewport or a collapsed domain yield an
/// all-zero grid with a [`HeatmapStatus::Degenerate`] status. A collapsed
/// domain also resets both domains to the configured fallbacks.
pub fn compute_heatmap<'a, P: HeatPoint>(
    points: &'a [P],
    spot: f64,
    viewport: Viewport,
    resolution: GridResolution,
    config: &HeatmapConfig,
) -> Heatmap<'a, P> {
    let (strike_domain, premium_domain) = compute_domains(points, spot, config);
    let mut heatmap = Heatmap {
        grid: HeatmapGrid::empty(resolution),
        strike_domain,
        premium_domain,
        status: HeatmapStatus::Drawable,
        viewport,
    };

    let degenerate = if !points.iter().any(usable) {
        Some(DegenerateReason::NoPoints)
    } else if viewport.is_empty() {
        Some(DegenerateReason::EmptyViewport)
    } else if resolution.cols == 0 || resolution.rows == 0 {
        Some(DegenerateReason::EmptyGrid)
    } else if strike_domain.is_degenerate() {
        Some(DegenerateReason::CollapsedStrikeDomain)
    } else if premium_domain.is_degenerate() {
        Some(DegenerateReason::CollapsedPremiumDomain)
    } else {
        None
    };
    if let Some(reason) = degenerate {
        if matches!(
            reason,
            DegenerateReason::CollapsedStrikeDomain | DegenerateReason::CollapsedPremiumDomain
        ) {
            let (s0, s1) = config.fallback_strike_domain;
            let (p0, p1) = config.fallback_premium_domain;
            heatmap.strike_domain = AxisDomain::new(s0, s1);
            heatmap.premium_domain = AxisDomain::new(p0, p1);
        }
        debug!(?reason, points = points.len(), "Heatmap is degenerate");
        heatmap.status = HeatmapStatus::Degenerate(reason);
        return heatmap;
    }

    let coords: Vec<(f64, f64)> = points.iter().map(|p| (p.strike(), p.premium())).collect();
    let index = config.index.build(coords);
    let falloff = strike_domain.span().hypot(premium_domain.span()) / config.intensity_divisor;

    for row in 0..resolution.rows {
        for col in 0..resolution.cols {
            let (sx, sy) = heatmap.cell_center_data(row, col);
            let cell = &mut heatmap.grid.cells[row * resolution.cols + col];
            if let Some(hit) = index.nearest(sx, sy) {
                let intensity = (1.0 - hit.distance / falloff).clamp(0.0, 1.0);
                cell.intensity = if intensity.is_finite() { intensity } else { 0.0 };
                cell.nearest = points.get(hit.index);
                cell.nearest_index = Some(hit.index);
            }
        }
    }

    debug!(
        points = points.len(),
        rows = resolution.rows,
        cols = resolution.cols,
        peak = heatmap.grid.max_intensity(),
        "Computed heatmap"
    );
    heatmap
}
