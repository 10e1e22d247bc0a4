//! Chart overlay geometry drawn on top of the heatmap
//!
//! Every function here returns nothing for a degenerate heatmap, so the
//! overlays can only ever be placed on usable scales.

use super::Heatmap;
use super::scale::LinearScale;
use crate::contract::{Contract, HeatPoint, OptionType};
use crate::enrich::EnrichedContract;
use serde::{Deserialize, Serialize};

/// Deltas marked with vertical guide lines
pub const DELTA_GUIDE_THRESHOLDS: [f64; 3] = [0.25, 0.5, 0.75];
/// Marker radius at zero volume
pub const MARKER_RADIUS_MIN: f64 = 7.0;
/// Marker radius at the largest volume
pub const MARKER_RADIUS_MAX: f64 = 11.0;
/// Highlight only strikes within this share of spot
pub const HIGHLIGHT_MAX_SPOT_DISTANCE: f64 = 0.05;
/// Highlight band of the time-value share of premium (exclusive)
pub const HIGHLIGHT_TIME_VALUE_BAND: (f64, f64) = (0.4, 0.6);

/// Vertical guide at the call closest to a delta threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaGuide {
    /// Target delta
    pub threshold: f64,
    /// Strike of the closest call
    pub strike: f64,
    /// Pixel x of that strike
    pub x: f64,
}

/// Marker for one ranked contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointMarker {
    /// Exchange symbol, if known
    pub symbol: Option<String>,
    /// Strike
    pub strike: f64,
    /// Premium
    pub premium: f64,
    /// Pixel x
    pub x: f64,
    /// Pixel y
    pub y: f64,
    /// Radius from the volume scale
    pub radius: f64,
    /// Near spot with a balanced time-value share
    pub highlighted: bool,
}

/// All overlay layers for one chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    /// Premium curve across strikes
    pub price_line: Vec<(f64, f64)>,
    /// Pixel x of spot
    pub spot_x: Option<f64>,
    /// Delta guide lines
    pub delta_guides: Vec<DeltaGuide>,
    /// Ranked contract markers
    pub markers: Vec<PointMarker>,
}

impl Overlay {
    /// Build every layer
    pub fn build<P: HeatPoint>(
        heatmap: &Heatmap<'_, P>,
        points: &[P],
        calls: &[Contract],
        ranked: &[EnrichedContract],
        spot: f64,
    ) -> Self {
        Self {
            price_line: price_line(heatmap, points),
            spot_x: spot_marker(heatmap, spot),
            delta_guides: delta_guides(heatmap, calls),
            markers: markers(heatmap, ranked, spot),
        }
    }
}

/// Points sorted by strike in pixel space, non-finite points skipped
pub fn price_line<P: HeatPoint, Q: HeatPoint>(
    heatmap: &Heatmap<'_, Q>,
    points: &[P],
) -> Vec<(f64, f64)> {
    if !heatmap.is_drawable() {
        return Vec::new();
    }
    let (x, y) = (heatmap.strike_scale(), heatmap.premium_scale());
    let mut line: Vec<(f64, f64)> = points
        .iter()
        .map(|p| (p.strike(), p.premium()))
        .filter(|(s, m)| s.is_finite() && m.is_finite())
        .collect();
    line.sort_by(|a, b| a.0.total_cmp(&b.0));
    line.into_iter().map(|(s, m)| (x.map(s), y.map(m))).collect()
}

/// Pixel x of spot, absent for a non-finite spot
pub fn spot_marker<P>(heatmap: &Heatmap<'_, P>, spot: f64) -> Option<f64> {
    if !heatmap.is_drawable() || !spot.is_finite() || heatmap.strike_domain.is_degenerate() {
        return None;
    }
    Some(heatmap.strike_scale().map(spot))
}

/// Closest call to each guide threshold
///
/// Calls without delta lose to any call with one; when no call has delta the
/// first call is used.
pub fn delta_guides<P>(heatmap: &Heatmap<'_, P>, contracts: &[Contract]) -> Vec<DeltaGuide> {
    if !heatmap.is_drawable() {
        return Vec::new();
    }
    let x = heatmap.strike_scale();
    let calls: Vec<&Contract> = contracts
        .iter()
        .filter(|c| c.kind == OptionType::Call && c.strike.is_finite())
        .collect();

    DELTA_GUIDE_THRESHOLDS
        .iter()
        .filter_map(|&threshold| {
            let gap = |c: &Contract| c.delta.map_or(f64::INFINITY, |d| (d - threshold).abs());
            let closest = calls
                .iter()
                .copied()
                .reduce(|best, c| if gap(c) < gap(best) { c } else { best })?;
            Some(DeltaGuide {
                threshold,
                strike: closest.strike,
                x: x.map(closest.strike),
            })
        })
        .collect()
}

/// Volume-sized markers for ranked contracts
pub fn markers<P>(
    heatmap: &Heatmap<'_, P>,
    ranked: &[EnrichedContract],
    spot: f64,
) -> Vec<PointMarker> {
    if !heatmap.is_drawable() {
        return Vec::new();
    }
    let (x, y) = (heatmap.strike_scale(), heatmap.premium_scale());
    let max_volume = ranked
        .iter()
        .map(|e| e.contract.volume)
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max);
    let max_volume = if max_volume > 0.0 { max_volume } else { 1.0 };
    let radius = LinearScale::new((0.0, max_volume.sqrt()), (MARKER_RADIUS_MIN, MARKER_RADIUS_MAX));

    ranked
        .iter()
        .map(|e| &e.contract)
        .filter(|c| c.strike.is_finite() && c.mark_price.is_finite())
        .map(|c| {
            let volume = if c.volume.is_finite() { c.volume.max(0.0) } else { 0.0 };
            PointMarker {
                symbol: c.symbol.clone(),
                strike: c.strike,
                premium: c.mark_price,
                x: x.map(c.strike),
                y: y.map(c.mark_price),
                radius: radius.map(volume.sqrt()),
                highlighted: is_highlighted(c, spot),
            }
        })
        .collect()
}

/// Near spot with time value between 40% and 60% of premium
///
/// Unlike the ranker's time-value percentage, the share divides by the mark
/// itself, so sub-unit premiums are measured at their own scale.
pub fn is_highlighted(contract: &Contract, spot: f64) -> bool {
    if !spot.is_finite() || spot <= 0.0 {
        return false;
    }
    let mark = contract.mark_price;
    let time_value = (mark - contract.intrinsic_value(spot)).max(0.0);
    let premium = if mark == 0.0 || mark.is_nan() { 1.0 } else { mark };
    let share = time_value / premium;
    let (lo, hi) = HIGHLIGHT_TIME_VALUE_BAND;
    contract.distance_from(spot) / spot < HIGHLIGHT_MAX_SPOT_DISTANCE && share > lo && share < hi
}
