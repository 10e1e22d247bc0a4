//! Metric enrichment
//!
//! Derives the fair premium proxy, premium anomaly, buy score and alert flags
//! for each contract against the current spot. Missing or non-finite inputs
//! fall back to neutral values so nothing downstream ever sees `NaN`.

use crate::config::{ANOMALY_BOUND, AlertThresholds, NEUTRAL_SCORE, ScoringConfig};
use crate::contract::{Contract, HeatPoint};
use serde::{Deserialize, Serialize};

/// Alert flags derived from one contract
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alerts {
    /// `|delta|` inside the decision zone
    pub is_in_decision_zone: bool,
    /// Mark well below the fair premium
    pub is_underpriced: bool,
    /// Mark well above the fair premium
    pub is_overpriced: bool,
    /// Volume change above the spike threshold
    pub has_volume_spike: bool,
    /// Open interest change above the spike threshold
    pub has_oi_spike: bool,
    /// Delta and price disagree
    pub has_imbalance: bool,
}

impl Alerts {
    /// True when any flag is raised
    pub fn any(&self) -> bool {
        self.is_in_decision_zone
            || self.is_underpriced
            || self.is_overpriced
            || self.has_volume_spike
            || self.has_oi_spike
            || self.has_imbalance
    }
}

/// The four buy-score components, each in `[0, 100]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Proximity of strike to spot
    pub distance: f64,
    /// Delta inside or near the decision zone
    pub delta: f64,
    /// Mark close to the fair premium
    pub premium: f64,
    /// Liquidity
    pub volume: f64,
}

/// Contract with derived metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedContract {
    /// Source contract
    #[serde(flatten)]
    pub contract: Contract,
    /// Linear fair premium proxy, zero without delta
    pub fair_premium: f64,
    /// Percent deviation of mark from fair, in `[-100, 100]`
    pub premium_anomaly: f64,
    /// Composite score in `[0, 100]`
    pub buy_score: f64,
    /// Alert flags
    pub alerts: Alerts,
}

impl HeatPoint for EnrichedContract {
    fn strike(&self) -> f64 {
        self.contract.strike
    }

    fn premium(&self) -> f64 {
        self.contract.mark_price
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

/// `|delta| x |strike - spot| x scale`, floored; zero when delta is absent
pub fn fair_premium(contract: &Contract, spot: f64, scoring: &ScoringConfig) -> f64 {
    let Some(delta) = contract.delta else {
        return 0.0;
    };
    let proxy = delta.abs() * contract.distance_from(spot) * scoring.fair_premium_scale;
    if !proxy.is_finite() {
        return 0.0;
    }
    proxy.max(scoring.fair_premium_floor)
}

/// Percent deviation of mark from fair premium, clamped to `[-100, 100]`
///
/// A zero fair premium means delta was missing and yields 0.
pub fn premium_anomaly(mark_price: f64, fair_premium: f64, scoring: &ScoringConfig) -> f64 {
    if fair_premium <= 0.0 || !fair_premium.is_finite() {
        return 0.0;
    }
    let ratio = (mark_price - fair_premium) / fair_premium.max(scoring.fair_premium_floor);
    finite_or(ratio * 100.0, 0.0).clamp(-ANOMALY_BOUND, ANOMALY_BOUND)
}

/// Buy-score components for one contract
pub fn score_breakdown(
    contract: &Contract,
    spot: f64,
    fair_premium: f64,
    scoring: &ScoringConfig,
) -> ScoreBreakdown {
    let distance = 100.0
        - contract.distance_from(spot) / scoring.distance_unit * scoring.distance_points_per_unit;

    let delta = match contract.delta {
        Some(d) => {
            let ad = d.abs();
            if (scoring.decision_zone_min..=scoring.decision_zone_max).contains(&ad) {
                100.0
            } else {
                50.0 * (1.0 - (ad - scoring.delta_center).abs() / scoring.delta_center)
            }
        }
        None => NEUTRAL_SCORE,
    };

    let premium = if contract.delta.is_some() && fair_premium > 0.0 {
        100.0 - (contract.mark_price - fair_premium).abs() / fair_premium * 100.0
    } else {
        NEUTRAL_SCORE
    };

    let volume = (contract.volume / scoring.volume_divisor).min(100.0);

    let bounded = |v: f64| finite_or(v, NEUTRAL_SCORE).clamp(0.0, 100.0);
    ScoreBreakdown {
        distance: bounded(distance),
        delta: bounded(delta),
        premium: bounded(premium),
        volume: bounded(volume),
    }
}

/// Weighted, rounded composite of the breakdown in `[0, 100]`
pub fn buy_score(breakdown: &ScoreBreakdown, scoring: &ScoringConfig) -> f64 {
    let weights = scoring.effective_weights();
    let total = breakdown.distance * weights.distance
        + breakdown.delta * weights.delta
        + breakdown.premium * weights.premium
        + breakdown.volume * weights.volume;
    finite_or(total, NEUTRAL_SCORE).round().clamp(0.0, 100.0)
}

/// Alert flags; price and delta alerts stay down when delta is absent
///
/// Price and imbalance alerts also stay down without a usable fair premium,
/// which is the case when spot is not finite.
pub fn alerts(
    contract: &Contract,
    fair_premium: f64,
    scoring: &ScoringConfig,
    thresholds: &AlertThresholds,
) -> Alerts {
    let mut flags = Alerts {
        has_volume_spike: contract.volume_change > thresholds.volume_spike_pct,
        has_oi_spike: contract.oi_change > thresholds.oi_spike_pct,
        ..Alerts::default()
    };

    let Some(delta) = contract.delta else {
        return flags;
    };
    let ad = delta.abs();
    let mark = contract.mark_price;

    flags.is_in_decision_zone = ad >= scoring.decision_zone_min && ad <= scoring.decision_zone_max;
    if !(fair_premium.is_finite() && fair_premium > 0.0) {
        return flags;
    }
    flags.is_underpriced = mark < fair_premium * thresholds.underpriced_ratio;
    flags.is_overpriced = mark > fair_premium * thresholds.overpriced_ratio;
    flags.has_imbalance = (ad > thresholds.imbalance_high_delta
        && mark < fair_premium * thresholds.imbalance_high_delta_ratio)
        || (ad < thresholds.imbalance_low_delta
            && mark > fair_premium * thresholds.imbalance_low_delta_ratio);
    flags
}

/// Spot and the core numeric fields are all finite
///
/// When this fails the whole buy score is neutral rather than built from
/// partially neutral components.
pub fn has_finite_inputs(contract: &Contract, spot: f64) -> bool {
    spot.is_finite()
        && contract.strike.is_finite()
        && contract.mark_price.is_finite()
        && contract.volume.is_finite()
        && contract.delta.is_none_or(f64::is_finite)
}

/// Enrich one contract against spot
pub fn enrich_contract(
    contract: &Contract,
    spot: f64,
    scoring: &ScoringConfig,
    thresholds: &AlertThresholds,
) -> EnrichedContract {
    let contract = if scoring.estimate_missing_greeks {
        contract.with_estimated_greeks(spot)
    } else {
        contract.clone()
    };

    let fair = fair_premium(&contract, spot, scoring);
    let score = if has_finite_inputs(&contract, spot) {
        buy_score(&score_breakdown(&contract, spot, fair, scoring), scoring)
    } else {
        NEUTRAL_SCORE
    };

    EnrichedContract {
        fair_premium: fair,
        premium_anomaly: premium_anomaly(contract.mark_price, fair, scoring),
        buy_score: score,
        alerts: alerts(&contract, fair, scoring, thresholds),
        contract,
    }
}

/// Enrich a batch, preserving order
pub fn enrich_all(
    contracts: &[Contract],
    spot: f64,
    scoring: &ScoringConfig,
    thresholds: &AlertThresholds,
) -> Vec<EnrichedContract> {
    contracts
        .iter()
        .map(|c| enrich_contract(c, spot, scoring, thresholds))
        .collect()
}
