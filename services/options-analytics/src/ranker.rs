//! Recommendation ranking
//!
//! Filters enriched contracts to one side (and optionally one expiry), drops
//! strikes far from spot and poor risk/reward, then orders by volume.

use crate::config::{RankerConfig, WeightPreset};
use crate::contract::{Contract, OptionType};
use crate::enrich::EnrichedContract;
use crate::error::{AnalyticsError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Expiry scope of a ranking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryFilter {
    /// Every expiry
    #[default]
    All,
    /// A single expiry date
    On(NaiveDate),
}

impl ExpiryFilter {
    /// Whether a date passes the filter
    pub fn matches(&self, expiry: NaiveDate) -> bool {
        match self {
            ExpiryFilter::All => true,
            ExpiryFilter::On(date) => *date == expiry,
        }
    }
}

impl FromStr for ExpiryFilter {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(ExpiryFilter::All);
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(ExpiryFilter::On)
            .map_err(|_| AnalyticsError::InvalidConfig(format!("invalid expiry filter '{s}'")))
    }
}

/// Options for one ranking call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankOptions {
    /// Side to rank
    #[serde(rename = "type")]
    pub kind: OptionType,
    /// Expiry scope
    #[serde(default)]
    pub expiry: ExpiryFilter,
    /// Weight preset overriding the configured weights for this call
    #[serde(default)]
    pub weight_preset: Option<WeightPreset>,
}

impl RankOptions {
    /// Rank one side across every expiry with the configured weights
    pub fn new(kind: OptionType) -> Self {
        Self {
            kind,
            expiry: ExpiryFilter::All,
            weight_preset: None,
        }
    }

    /// Restrict to one expiry
    #[must_use]
    pub fn with_expiry(mut self, expiry: ExpiryFilter) -> Self {
        self.expiry = expiry;
        self
    }

    /// Score with a specific preset
    #[must_use]
    pub fn with_preset(mut self, preset: WeightPreset) -> Self {
        self.weight_preset = Some(preset);
        self
    }
}

// ============================================================================
// RISK / REWARD
// ============================================================================

/// Risk/reward classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskReward {
    /// Above the good threshold
    Good,
    /// Between the thresholds
    Neutral,
    /// Below the poor threshold
    Poor,
}

impl RiskReward {
    /// Classify a risk/reward value
    pub fn classify(rr: f64, config: &RankerConfig) -> Self {
        if rr > config.good_rr_threshold {
            RiskReward::Good
        } else if rr < config.poor_rr_threshold {
            RiskReward::Poor
        } else {
            RiskReward::Neutral
        }
    }
}

/// Share of the premium that is time value, percent
pub fn time_value_pct(contract: &Contract, spot: f64) -> f64 {
    let time_value = (contract.mark_price - contract.intrinsic_value(spot)).max(0.0);
    time_value / contract.mark_price.max(1.0) * 100.0
}

/// `|delta x 100| - time value %`, absent without delta
pub fn risk_reward(contract: &Contract, spot: f64) -> Option<f64> {
    let delta = contract.delta?;
    let rr = (delta * 100.0).abs() - time_value_pct(contract, spot);
    rr.is_finite().then_some(rr)
}

/// Risk level shown alongside a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// `|delta| < 0.3`
    High,
    /// `|delta| < 0.7` or delta unknown
    Medium,
    /// Deep in the money
    Low,
}

impl RiskLevel {
    /// Level from delta
    pub fn from_delta(delta: Option<f64>) -> Self {
        match delta.map(f64::abs) {
            Some(ad) if ad < 0.3 => RiskLevel::High,
            Some(ad) if ad < 0.7 => RiskLevel::Medium,
            Some(_) => RiskLevel::Low,
            None => RiskLevel::Medium,
        }
    }
}

/// Percent return on premium for a 1% move of the underlying
pub fn estimated_return_pct(contract: &Contract, spot: f64) -> Option<f64> {
    let delta = contract.delta?;
    if contract.mark_price <= 0.0 {
        return None;
    }
    let pct = delta * spot * 0.01 / contract.mark_price * 100.0;
    pct.is_finite().then_some(pct)
}

// ============================================================================
// RANKING
// ============================================================================

fn liquidity(contract: &Contract) -> f64 {
    if contract.volume.is_finite() { contract.volume } else { 0.0 }
}

fn passes_risk_reward(contract: &Contract, spot: f64, config: &RankerConfig) -> bool {
    match risk_reward(contract, spot) {
        Some(rr) => rr >= config.poor_rr_threshold,
        None if config.reject_missing_delta => false,
        None => {
            let rr = -time_value_pct(contract, spot);
            rr >= config.poor_rr_threshold
        }
    }
}

/// Rank enriched contracts for one side
///
/// Returns at most `max_results` contracts of `options.kind`, sorted by volume
/// descending with ties in input order. A non-positive or non-finite spot
/// yields an empty list.
pub fn rank(
    contracts: &[EnrichedContract],
    spot: f64,
    options: &RankOptions,
    config: &RankerConfig,
) -> Vec<EnrichedContract> {
    if !spot.is_finite() || spot <= 0.0 {
        debug!(spot, "Spot unusable, nothing to rank");
        return Vec::new();
    }

    let mut ranked: Vec<EnrichedContract> = contracts
        .iter()
        .filter(|e| e.contract.kind == options.kind)
        .filter(|e| options.expiry.matches(e.contract.expiry))
        .filter(|e| e.contract.distance_from(spot) / spot < config.max_spot_distance)
        .filter(|e| passes_risk_reward(&e.contract, spot, config))
        .cloned()
        .collect();

    ranked.sort_by(|a, b| liquidity(&b.contract).total_cmp(&liquidity(&a.contract)));
    let survivors = ranked.len();
    ranked.truncate(config.max_results);

    debug!(
        kind = %options.kind,
        input = contracts.len(),
        survivors,
        returned = ranked.len(),
        "Ranked contracts"
    );
    ranked
}

/// Leading slice of a ranked list capped at `top_picks`
pub fn top_picks<'a>(
    ranked: &'a [EnrichedContract],
    config: &RankerConfig,
) -> &'a [EnrichedContract] {
    &ranked[..ranked.len().min(config.top_picks)]
}

/// Ranked contract with the figures shown on its card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Ranked contract
    #[serde(flatten)]
    pub enriched: EnrichedContract,
    /// Risk/reward class, absent without delta
    pub risk_reward: Option<RiskReward>,
    /// Risk level
    pub risk_level: RiskLevel,
    /// Return on premium for a 1% underlying move
    pub estimated_return_pct: Option<f64>,
}

impl Recommendation {
    /// Build the card figures for a ranked contract
    pub fn new(enriched: EnrichedContract, spot: f64, config: &RankerConfig) -> Self {
        let contract = &enriched.contract;
        Self {
            risk_reward: risk_reward(contract, spot).map(|rr| RiskReward::classify(rr, config)),
            risk_level: RiskLevel::from_delta(contract.delta),
            estimated_return_pct: estimated_return_pct(contract, spot),
            enriched,
        }
    }
}
