//! Configuration for the analytics engine
//!
//! Every threshold used by scoring, alerting, ranking and the heatmap lives
//! here as a named default. Call sites read them from the config tree so a
//! deployment can override any of them from a file or the environment.

use crate::error::{AnalyticsError, Result};
use crate::heatmap::index::IndexKind;
use serde::{Deserialize, Serialize};

// ============================================================================
// FAIR PREMIUM AND SCORING
// ============================================================================

/// Scale applied to `|delta| x distance` to get the fair premium proxy
pub const DEFAULT_FAIR_PREMIUM_SCALE: f64 = 0.1;
/// Floor applied to the fair premium before it is used as a divisor
pub const DEFAULT_FAIR_PREMIUM_FLOOR: f64 = 0.1;
/// Distance (in underlying units) per decay step of the distance score
pub const DEFAULT_DISTANCE_UNIT: f64 = 1000.0;
/// Points lost from the distance score per distance unit
pub const DEFAULT_DISTANCE_POINTS_PER_UNIT: f64 = 10.0;
/// Lower bound of the delta "decision zone"
pub const DEFAULT_DECISION_ZONE_MIN: f64 = 0.3;
/// Upper bound of the delta "decision zone"
pub const DEFAULT_DECISION_ZONE_MAX: f64 = 0.6;
/// Delta at which the out-of-zone delta score peaks
pub const DEFAULT_DELTA_CENTER: f64 = 0.45;
/// Volume divisor for the liquidity score
pub const DEFAULT_VOLUME_DIVISOR: f64 = 10.0;
/// Score used whenever an input needed for a score is missing or non-finite
pub const NEUTRAL_SCORE: f64 = 50.0;
/// Bound of the premium anomaly on either side of zero
pub const ANOMALY_BOUND: f64 = 100.0;

// ============================================================================
// ALERTS
// ============================================================================

/// Mark below `fair x ratio` flags the contract as underpriced
pub const DEFAULT_UNDERPRICED_RATIO: f64 = 0.7;
/// Mark above `fair x ratio` flags the contract as overpriced
pub const DEFAULT_OVERPRICED_RATIO: f64 = 1.3;
/// Volume change (percent) above which a spike is flagged
pub const DEFAULT_VOLUME_SPIKE_PCT: f64 = 25.0;
/// Open interest change (percent) above which a spike is flagged
pub const DEFAULT_OI_SPIKE_PCT: f64 = 15.0;
/// High-delta side of the imbalance rule
pub const DEFAULT_IMBALANCE_HIGH_DELTA: f64 = 0.5;
/// Cheapness ratio paired with the high-delta side
pub const DEFAULT_IMBALANCE_HIGH_DELTA_RATIO: f64 = 0.8;
/// Low-delta side of the imbalance rule
pub const DEFAULT_IMBALANCE_LOW_DELTA: f64 = 0.2;
/// Richness ratio paired with the low-delta side
pub const DEFAULT_IMBALANCE_LOW_DELTA_RATIO: f64 = 1.2;

// ============================================================================
// RANKER
// ============================================================================

/// Maximum relative distance of strike from spot
pub const DEFAULT_MAX_SPOT_DISTANCE: f64 = 0.2;
/// Risk/reward below this value rejects the contract
pub const DEFAULT_POOR_RR_THRESHOLD: f64 = -10.0;
/// Risk/reward above this value classifies as good
pub const DEFAULT_GOOD_RR_THRESHOLD: f64 = 10.0;
/// Ranked list cap
pub const DEFAULT_MAX_RESULTS: usize = 15;
/// Top-pick cap
pub const DEFAULT_TOP_PICKS: usize = 4;

// ============================================================================
// HEATMAP
// ============================================================================

/// Default grid columns
pub const DEFAULT_GRID_COLS: usize = 24;
/// Default grid rows
pub const DEFAULT_GRID_ROWS: usize = 15;
/// Divisor applied to the domain diagonal to get the intensity falloff scale
pub const DEFAULT_INTENSITY_DIVISOR: f64 = 4.0;
/// Minimum strike padding when strikes span a range
pub const DEFAULT_STRIKE_PAD_MIN: f64 = 100.0;
/// Strike padding as a share of the strike range
pub const DEFAULT_STRIKE_PAD_RATIO: f64 = 0.05;
/// Minimum strike padding when every point shares one strike
pub const DEFAULT_FLAT_STRIKE_PAD_MIN: f64 = 1.0;
/// Strike padding as a share of the strike when every point shares one strike
pub const DEFAULT_FLAT_STRIKE_PAD_RATIO: f64 = 0.1;
/// Band around spot the strike domain must cover
pub const DEFAULT_SPOT_BAND: f64 = 0.1;
/// Headroom multiplier above the maximum premium
pub const DEFAULT_PREMIUM_HEADROOM: f64 = 1.1;
/// Strike domain used when there are no points
pub const FALLBACK_STRIKE_DOMAIN: (f64, f64) = (0.0, 100_000.0);
/// Premium domain used when there are no points or all premiums are zero
pub const FALLBACK_PREMIUM_DOMAIN: (f64, f64) = (0.0, 100.0);

/// Root configuration for the analytics engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Raw record coercion
    pub normalizer: NormalizerConfig,
    /// Fair premium and buy score
    pub scoring: ScoringConfig,
    /// Alert thresholds
    pub alerts: AlertThresholds,
    /// Recommendation filtering
    pub ranker: RankerConfig,
    /// Heatmap geometry
    pub heatmap: HeatmapConfig,
    /// Log filter for the binary
    pub logging: LoggingConfig,
}

/// Raw record coercion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Multiplier applied to the raw IV (100 for feeds quoting IV as a fraction)
    pub iv_scale: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self { iv_scale: 1.0 }
    }
}

/// Delta/premium weight split between the two scoring call paths
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightPreset {
    /// Chart-adjacent path: delta 0.3, premium 0.4
    #[default]
    Chart,
    /// Service-adjacent path: delta 0.4, premium 0.3
    Service,
}

impl WeightPreset {
    /// Weights for this preset
    pub fn weights(self) -> ScoreWeights {
        match self {
            WeightPreset::Chart => ScoreWeights {
                distance: 0.2,
                delta: 0.3,
                premium: 0.4,
                volume: 0.1,
            },
            WeightPreset::Service => ScoreWeights {
                distance: 0.2,
                delta: 0.4,
                premium: 0.3,
                volume: 0.1,
            },
        }
    }
}

impl std::str::FromStr for WeightPreset {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chart" => Ok(WeightPreset::Chart),
            "service" => Ok(WeightPreset::Service),
            other => Err(AnalyticsError::InvalidConfig(format!(
                "unknown weight preset '{other}'"
            ))),
        }
    }
}

/// Weights of the four buy-score components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Weight of the distance-from-spot score
    pub distance: f64,
    /// Weight of the delta score
    pub delta: f64,
    /// Weight of the premium score
    pub premium: f64,
    /// Weight of the volume score
    pub volume: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        WeightPreset::default().weights()
    }
}

impl ScoreWeights {
    fn as_array(&self) -> [f64; 4] {
        [self.distance, self.delta, self.premium, self.volume]
    }
}

/// Fair premium and buy-score settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Preset used when no explicit weights are given
    pub weight_preset: WeightPreset,
    /// Explicit weights, overriding the preset
    pub weights: Option<ScoreWeights>,
    /// Scale of the fair premium proxy
    pub fair_premium_scale: f64,
    /// Floor of the fair premium
    pub fair_premium_floor: f64,
    /// Distance unit of the distance score
    pub distance_unit: f64,
    /// Points lost per distance unit
    pub distance_points_per_unit: f64,
    /// Lower bound of the delta decision zone
    pub decision_zone_min: f64,
    /// Upper bound of the delta decision zone
    pub decision_zone_max: f64,
    /// Peak of the out-of-zone delta score
    pub delta_center: f64,
    /// Volume divisor of the liquidity score
    pub volume_divisor: f64,
    /// Fill missing delta/gamma from moneyness before enrichment
    pub estimate_missing_greeks: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weight_preset: WeightPreset::default(),
            weights: None,
            fair_premium_scale: DEFAULT_FAIR_PREMIUM_SCALE,
            fair_premium_floor: DEFAULT_FAIR_PREMIUM_FLOOR,
            distance_unit: DEFAULT_DISTANCE_UNIT,
            distance_points_per_unit: DEFAULT_DISTANCE_POINTS_PER_UNIT,
            decision_zone_min: DEFAULT_DECISION_ZONE_MIN,
            decision_zone_max: DEFAULT_DECISION_ZONE_MAX,
            delta_center: DEFAULT_DELTA_CENTER,
            volume_divisor: DEFAULT_VOLUME_DIVISOR,
            estimate_missing_greeks: false,
        }
    }
}

impl ScoringConfig {
    /// Weights in effect: explicit weights win over the preset
    pub fn effective_weights(&self) -> ScoreWeights {
        self.weights.unwrap_or_else(|| self.weight_preset.weights())
    }

    /// Copy of this config using the given preset and no explicit weights
    #[must_use]
    pub fn with_preset(&self, preset: WeightPreset) -> Self {
        Self {
            weight_preset: preset,
            weights: None,
            ..self.clone()
        }
    }
}

/// Alert thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// Mark below `fair x ratio` is underpriced
    pub underpriced_ratio: f64,
    /// Mark above `fair x ratio` is overpriced
    pub overpriced_ratio: f64,
    /// Volume change spike threshold (percent)
    pub volume_spike_pct: f64,
    /// Open interest change spike threshold (percent)
    pub oi_spike_pct: f64,
    /// High-delta side of the imbalance rule
    pub imbalance_high_delta: f64,
    /// Ratio paired with the high-delta side
    pub imbalance_high_delta_ratio: f64,
    /// Low-delta side of the imbalance rule
    pub imbalance_low_delta: f64,
    /// Ratio paired with the low-delta side
    pub imbalance_low_delta_ratio: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            underpriced_ratio: DEFAULT_UNDERPRICED_RATIO,
            overpriced_ratio: DEFAULT_OVERPRICED_RATIO,
            volume_spike_pct: DEFAULT_VOLUME_SPIKE_PCT,
            oi_spike_pct: DEFAULT_OI_SPIKE_PCT,
            imbalance_high_delta: DEFAULT_IMBALANCE_HIGH_DELTA,
            imbalance_high_delta_ratio: DEFAULT_IMBALANCE_HIGH_DELTA_RATIO,
            imbalance_low_delta: DEFAULT_IMBALANCE_LOW_DELTA,
            imbalance_low_delta_ratio: DEFAULT_IMBALANCE_LOW_DELTA_RATIO,
        }
    }
}

/// Recommendation filter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerConfig {
    /// Maximum `|strike - spot| / spot` (exclusive)
    pub max_spot_distance: f64,
    /// Risk/reward below this rejects
    pub poor_rr_threshold: f64,
    /// Risk/reward above this is good
    pub good_rr_threshold: f64,
    /// Ranked list cap
    pub max_results: usize,
    /// Top-pick cap
    pub top_picks: usize,
    /// Reject contracts without delta instead of treating delta as zero
    pub reject_missing_delta: bool,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            max_spot_distance: DEFAULT_MAX_SPOT_DISTANCE,
            poor_rr_threshold: DEFAULT_POOR_RR_THRESHOLD,
            good_rr_threshold: DEFAULT_GOOD_RR_THRESHOLD,
            max_results: DEFAULT_MAX_RESULTS,
            top_picks: DEFAULT_TOP_PICKS,
            reject_missing_delta: true,
        }
    }
}

/// Heatmap geometry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Grid columns
    pub cols: usize,
    /// Grid rows
    pub rows: usize,
    /// Divisor of the domain diagonal for intensity falloff
    pub intensity_divisor: f64,
    /// Minimum strike padding
    pub strike_pad_min: f64,
    /// Strike padding share of range
    pub strike_pad_ratio: f64,
    /// Minimum padding for a single-strike set
    pub flat_strike_pad_min: f64,
    /// Padding share of strike for a single-strike set
    pub flat_strike_pad_ratio: f64,
    /// Band around spot the strike domain covers
    pub spot_band: f64,
    /// Headroom above the maximum premium
    pub premium_headroom: f64,
    /// Strike domain used without points
    pub fallback_strike_domain: (f64, f64),
    /// Premium domain used without points
    pub fallback_premium_domain: (f64, f64),
    /// Nearest-point search strategy
    pub index: IndexKind,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            cols: DEFAULT_GRID_COLS,
            rows: DEFAULT_GRID_ROWS,
            intensity_divisor: DEFAULT_INTENSITY_DIVISOR,
            strike_pad_min: DEFAULT_STRIKE_PAD_MIN,
            strike_pad_ratio: DEFAULT_STRIKE_PAD_RATIO,
            flat_strike_pad_min: DEFAULT_FLAT_STRIKE_PAD_MIN,
            flat_strike_pad_ratio: DEFAULT_FLAT_STRIKE_PAD_RATIO,
            spot_band: DEFAULT_SPOT_BAND,
            premium_headroom: DEFAULT_PREMIUM_HEADROOM,
            fallback_strike_domain: FALLBACK_STRIKE_DOMAIN,
            fallback_premium_domain: FALLBACK_PREMIUM_DOMAIN,
            index: IndexKind::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "options_analytics=info".to_string(),
        }
    }
}

impl AnalyticsConfig {
    /// Environment prefix for overrides, e.g. `OPTIONS_ANALYTICS__RANKER__TOP_PICKS=3`
    pub const ENV_PREFIX: &'static str = "OPTIONS_ANALYTICS";

    /// Load configuration from an optional file layered under the environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        Self::load(Some(path))
    }

    /// Check values that would make scoring or the grid meaningless
    pub fn validate(&self) -> Result<()> {
        let scoring = &self.scoring;
        if scoring
            .effective_weights()
            .as_array()
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(AnalyticsError::InvalidConfig(
                "score weights must be finite and non-negative".to_string(),
            ));
        }
        if !(scoring.fair_premium_floor > 0.0) {
            return Err(AnalyticsError::InvalidConfig(
                "fair_premium_floor must be positive".to_string(),
            ));
        }
        if !(scoring.distance_unit > 0.0) || !(scoring.volume_divisor > 0.0) {
            return Err(AnalyticsError::InvalidConfig(
                "distance_unit and volume_divisor must be positive".to_string(),
            ));
        }
        if !(scoring.delta_center > 0.0) {
            return Err(AnalyticsError::InvalidConfig(
                "delta_center must be positive".to_string(),
            ));
        }
        if scoring.decision_zone_min > scoring.decision_zone_max {
            return Err(AnalyticsError::InvalidConfig(format!(
                "decision zone [{}, {}] is inverted",
                scoring.decision_zone_min, scoring.decision_zone_max
            )));
        }
        if self.ranker.top_picks > self.ranker.max_results {
            return Err(AnalyticsError::InvalidConfig(format!(
                "top_picks ({}) exceeds max_results ({})",
                self.ranker.top_picks, self.ranker.max_results
            )));
        }
        if self.heatmap.cols == 0 || self.heatmap.rows == 0 {
            return Err(AnalyticsError::InvalidConfig(
                "heatmap resolution must be at least 1x1".to_string(),
            ));
        }
        if !(self.heatmap.intensity_divisor > 0.0) {
            return Err(AnalyticsError::InvalidConfig(
                "intensity_divisor must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
