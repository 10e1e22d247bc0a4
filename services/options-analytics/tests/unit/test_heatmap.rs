//! Unit tests for the proximity heatmap
//!
//! Tests cover:
//! - Axis domains with padding, spot band and premium headroom
//! - Fallback domains and degenerate inputs
//! - Nearest-point assignment and intensity falloff
//! - Cell geometry and scale mapping

use crate::assertions::assert_grid_consistent;
use crate::utils::{SPOT, init_test_env};
use approx::assert_relative_eq;
use options_analytics::config::HeatmapConfig;
use options_analytics::heatmap::compute_domains;
use options_analytics::heatmap::index::IndexKind;
use options_analytics::{
    DegenerateReason, GridResolution, HeatmapStatus, PricePoint, Viewport, compute_heatmap,
};
use rstest::*;

#[fixture]
fn config() -> HeatmapConfig {
    HeatmapConfig::default()
}

#[fixture]
fn resolution() -> GridResolution {
    GridResolution { cols: 24, rows: 15 }
}

#[fixture]
fn two_points() -> Vec<PricePoint> {
    vec![PricePoint::new(90000.0, 7500.0), PricePoint::new(100000.0, 2400.0)]
}

#[rstest]
fn test_two_point_domains(two_points: Vec<PricePoint>, config: HeatmapConfig) {
    let (strike, premium) = compute_domains(&two_points, 93762.0, &config);

    // Padding of 500 is swallowed by the spot band on both sides
    assert_relative_eq!(strike.min, 84385.8, epsilon = 1e-6);
    assert_relative_eq!(strike.max, 103138.2, epsilon = 1e-6);
    assert_eq!(premium.min, 0.0);
    assert_relative_eq!(premium.max, 8250.0, epsilon = 1e-6);
}

#[rstest]
fn test_padding_beyond_spot_band(config: HeatmapConfig) {
    let points = vec![PricePoint::new(60000.0, 30000.0), PricePoint::new(140000.0, 10.0)];
    let (strike, _) = compute_domains(&points, SPOT, &config);
    assert_relative_eq!(strike.min, 60000.0 - 4000.0, epsilon = 1e-6);
    assert_relative_eq!(strike.max, 140000.0 + 4000.0, epsilon = 1e-6);
}

#[rstest]
fn test_single_strike_domain(config: HeatmapConfig) {
    let points = vec![PricePoint::new(95000.0, 4600.0)];
    let (strike, premium) = compute_domains(&points, SPOT, &config);

    assert_relative_eq!(strike.min, 84386.16, epsilon = 1e-6);
    assert_relative_eq!(strike.max, 104500.0, epsilon = 1e-6);
    assert_relative_eq!(premium.max, 5060.0, epsilon = 1e-6);
}

#[rstest]
fn test_non_finite_spot_skips_band(two_points: Vec<PricePoint>, config: HeatmapConfig) {
    let (strike, _) = compute_domains(&two_points, f64::NAN, &config);
    assert_eq!(strike.min, 89500.0);
    assert_eq!(strike.max, 100500.0);
}

#[rstest]
fn test_zero_premiums_use_fallback_top(config: HeatmapConfig) {
    let points = vec![PricePoint::new(90000.0, 0.0), PricePoint::new(95000.0, -20.0)];
    let (_, premium) = compute_domains(&points, SPOT, &config);
    assert_eq!(premium.as_tuple(), (0.0, 100.0));
}

#[rstest]
fn test_empty_input_is_degenerate(config: HeatmapConfig, resolution: GridResolution) {
    init_test_env();
    let points: Vec<PricePoint> = Vec::new();
    let heatmap = compute_heatmap(&points, SPOT, Viewport::default(), resolution, &config);

    assert_eq!(heatmap.status, HeatmapStatus::Degenerate(DegenerateReason::NoPoints));
    assert_eq!(heatmap.strike_domain.as_tuple(), (0.0, 100000.0));
    assert_eq!(heatmap.premium_domain.as_tuple(), (0.0, 100.0));
    assert_eq!(heatmap.grid.cells.len(), 360);
    assert_eq!(heatmap.grid.max_intensity(), 0.0);
    assert!(heatmap.grid.cells.iter().all(|c| c.nearest.is_none()));
}

#[rstest]
fn test_non_finite_points_only_is_degenerate(config: HeatmapConfig, resolution: GridResolution) {
    let points = vec![PricePoint::new(f64::NAN, 10.0), PricePoint::new(90000.0, f64::INFINITY)];
    let heatmap = compute_heatmap(&points, SPOT, Viewport::default(), resolution, &config);
    assert_eq!(heatmap.status, HeatmapStatus::Degenerate(DegenerateReason::NoPoints));
    assert_grid_consistent(&heatmap);
}

#[rstest]
#[case(Viewport::new(100.0, 100.0))]
#[case(Viewport::new(0.0, 0.0))]
#[case(Viewport::new(f64::NAN, 600.0))]
fn test_empty_viewport_is_degenerate(
    two_points: Vec<PricePoint>,
    config: HeatmapConfig,
    resolution: GridResolution,
    #[case] viewport: Viewport,
) {
    let heatmap = compute_heatmap(&two_points, SPOT, viewport, resolution, &config);
    assert_eq!(heatmap.status, HeatmapStatus::Degenerate(DegenerateReason::EmptyViewport));
    assert!(!heatmap.is_drawable());
    assert_eq!(heatmap.grid.max_intensity(), 0.0);
}

#[rstest]
fn test_empty_grid_is_degenerate(two_points: Vec<PricePoint>, config: HeatmapConfig) {
    let resolution = GridResolution { cols: 0, rows: 15 };
    let heatmap = compute_heatmap(&two_points, SPOT, Viewport::default(), resolution, &config);
    assert_eq!(heatmap.status, HeatmapStatus::Degenerate(DegenerateReason::EmptyGrid));
    assert!(heatmap.grid.cells.is_empty());
}

#[rstest]
fn test_overflowing_premium_is_degenerate(config: HeatmapConfig, resolution: GridResolution) {
    let points = vec![PricePoint::new(95000.0, f64::MAX)];
    let heatmap = compute_heatmap(&points, SPOT, Viewport::default(), resolution, &config);
    assert_eq!(
        heatmap.status,
        HeatmapStatus::Degenerate(DegenerateReason::CollapsedPremiumDomain)
    );
    assert_grid_consistent(&heatmap);
    assert_eq!(heatmap.strike_domain.as_tuple(), config.fallback_strike_domain);
    assert_eq!(heatmap.premium_domain.as_tuple(), config.fallback_premium_domain);
    assert!(heatmap.premium_domain.max.is_finite());
}

#[rstest]
fn test_corner_cells_take_nearest_point(
    two_points: Vec<PricePoint>,
    config: HeatmapConfig,
    resolution: GridResolution,
) {
    let heatmap = compute_heatmap(&two_points, 93762.0, Viewport::default(), resolution, &config);
    assert!(heatmap.is_drawable());
    assert_grid_consistent(&heatmap);

    let top_left = heatmap.grid.cell(0, 0).expect("cell in grid");
    assert_eq!(top_left.nearest_index, Some(0));
    assert!(std::ptr::eq(top_left.nearest.expect("nearest set"), &two_points[0]));

    let bottom_right = heatmap.grid.cell(14, 23).expect("cell in grid");
    assert_eq!(bottom_right.nearest_index, Some(1));
    assert!(bottom_right.intensity > 0.0);

    assert!(heatmap.grid.cell(15, 0).is_none());
    assert!(heatmap.grid.cell(0, 24).is_none());
}

#[rstest]
fn test_intensity_falls_off_with_distance(
    two_points: Vec<PricePoint>,
    config: HeatmapConfig,
    resolution: GridResolution,
) {
    let heatmap = compute_heatmap(&two_points, 93762.0, Viewport::default(), resolution, &config);
    let falloff = heatmap
        .strike_domain
        .span()
        .hypot(heatmap.premium_domain.span())
        / config.intensity_divisor;

    for row in 0..resolution.rows {
        for col in 0..resolution.cols {
            let cell = heatmap.grid.cell(row, col).expect("cell in grid");
            let index = cell.nearest_index.expect("every cell has a nearest point");
            let (sx, sy) = heatmap.cell_center_data(row, col);
            let p = &two_points[index];
            let distance = (p.strike - sx).hypot(p.mark_price - sy);
            let expected = (1.0 - distance / falloff).clamp(0.0, 1.0);
            assert_relative_eq!(cell.intensity, expected, epsilon = 1e-9);
        }
    }
    assert!(heatmap.grid.max_intensity() > 0.9);
}

#[rstest]
fn test_cell_geometry(
    two_points: Vec<PricePoint>,
    config: HeatmapConfig,
    resolution: GridResolution,
) {
    let heatmap = compute_heatmap(&two_points, 93762.0, Viewport::default(), resolution, &config);
    let (w, h) = heatmap.cell_size();
    assert_relative_eq!(w, 820.0 / 24.0, epsilon = 1e-9);
    assert_relative_eq!(h, 460.0 / 15.0, epsilon = 1e-9);

    let (px, py) = heatmap.cell_center(0, 0);
    assert_relative_eq!(px, w / 2.0, epsilon = 1e-9);
    assert_relative_eq!(py, h / 2.0, epsilon = 1e-9);

    // Row 0 sits at the top of the chart, i.e. the highest premiums
    let (_, top) = heatmap.cell_center_data(0, 0);
    let (_, bottom) = heatmap.cell_center_data(14, 0);
    assert!(top > bottom);

    let x = heatmap.strike_scale();
    assert_eq!(x.map(heatmap.strike_domain.min), 0.0);
    assert_relative_eq!(x.map(heatmap.strike_domain.max), 820.0, epsilon = 1e-9);
    assert_eq!(x.map(1.0e9), 820.0);
    let y = heatmap.premium_scale();
    assert_eq!(y.map(0.0), 460.0);
    assert_eq!(y.map(-500.0), 460.0);
}

#[rstest]
fn test_heatmap_is_deterministic(config: HeatmapConfig, resolution: GridResolution) {
    let points: Vec<PricePoint> = (0..40)
        .map(|i| PricePoint::new(70000.0 + i as f64 * 1000.0, 20000.0 / (1.0 + i as f64)))
        .collect();
    let first = compute_heatmap(&points, SPOT, Viewport::default(), resolution, &config);
    let second = compute_heatmap(&points, SPOT, Viewport::default(), resolution, &config);
    assert_eq!(first, second);
}

#[rstest]
fn test_bucket_grid_matches_brute_force(resolution: GridResolution) {
    let points: Vec<PricePoint> = (0..60)
        .map(|i| {
            let strike = 60000.0 + (i * 7919 % 60) as f64 * 1000.0;
            PricePoint::new(strike, ((i * 104729) % 9000) as f64)
        })
        .collect();

    let brute = HeatmapConfig::default();
    let bucket = HeatmapConfig {
        index: IndexKind::BucketGrid,
        ..HeatmapConfig::default()
    };
    let a = compute_heatmap(&points, SPOT, Viewport::default(), resolution, &brute);
    let b = compute_heatmap(&points, SPOT, Viewport::default(), resolution, &bucket);

    for (ca, cb) in a.grid.cells.iter().zip(&b.grid.cells) {
        assert_eq!(ca.nearest_index, cb.nearest_index);
        assert_eq!(ca.intensity, cb.intensity);
    }
}

#[rstest]
fn test_default_resolution_from_config(config: HeatmapConfig) {
    assert_eq!(GridResolution::from_config(&config), GridResolution { cols: 24, rows: 15 });
}
