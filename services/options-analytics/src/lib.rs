//! Options analytics and heatmap engine
//!
//! Features:
//! - Contract normalization from loosely typed feed records
//! - Fair premium proxy, premium anomaly, buy score and alert flags
//! - Recommendation ranking by proximity, risk/reward and liquidity
//! - Proximity heatmap over strike x premium space with chart overlays
//!
//! Every computation is a pure function over immutable inputs. The engine
//! holds only its configuration and can be shared freely across threads.

#![warn(missing_docs)]

pub mod config;
pub mod contract;
pub mod enrich;
pub mod error;
pub mod heatmap;
pub mod ranker;
pub mod synthetic;

pub use config::{AnalyticsConfig, ScoreWeights, WeightPreset};
pub use contract::{
    Contract, HeatPoint, NormalizedChain, OptionType, PricePoint, RawContract, normalize_chain,
    normalize_contract,
};
pub use enrich::{Alerts, EnrichedContract, enrich_contract};
pub use error::{AnalyticsError, ContractRejection, Result};
pub use heatmap::overlay::Overlay;
pub use heatmap::{
    AxisDomain, DegenerateReason, GridResolution, Heatmap, HeatmapStatus, Margins, Viewport,
    compute_heatmap,
};
pub use ranker::{ExpiryFilter, RankOptions, Recommendation, RiskLevel, RiskReward};

use tracing::{debug, info};

// ============================================================================
// ENGINE
// ============================================================================

/// Entry points over a validated configuration
#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    /// Create an engine, rejecting invalid configuration
    pub fn new(config: AnalyticsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration
    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Normalize a raw feed batch, skipping bad records
    pub fn ingest(&self, raws: &[RawContract]) -> NormalizedChain {
        let chain = normalize_chain(raws, &self.config.normalizer);
        info!(
            records = raws.len(),
            calls = chain.calls.len(),
            puts = chain.puts.len(),
            expirations = chain.expirations.len(),
            rejected = chain.rejected,
            "Ingested option chain"
        );
        chain
    }

    /// Enrich contracts against spot with the configured weights
    pub fn enrich(&self, contracts: &[Contract], spot: f64) -> Vec<EnrichedContract> {
        enrich::enrich_all(contracts, spot, &self.config.scoring, &self.config.alerts)
    }

    /// Enrich, then rank one side into the bounded recommended list
    ///
    /// At most `ranker.max_results` contracts, all of `options.kind`.
    pub fn enrich_and_rank(
        &self,
        contracts: &[Contract],
        spot: f64,
        options: &RankOptions,
    ) -> Vec<EnrichedContract> {
        let scoring = match options.weight_preset {
            Some(preset) => self.config.scoring.with_preset(preset),
            None => self.config.scoring.clone(),
        };
        let enriched = enrich::enrich_all(contracts, spot, &scoring, &self.config.alerts);
        let ranked = ranker::rank(&enriched, spot, options, &self.config.ranker);
        debug!(
            kind = %options.kind,
            expiry = ?options.expiry,
            ranked = ranked.len(),
            "Enriched and ranked"
        );
        ranked
    }

    /// Leading top picks of a ranked list
    pub fn top_picks<'a>(&self, ranked: &'a [EnrichedContract]) -> &'a [EnrichedContract] {
        ranker::top_picks(ranked, &self.config.ranker)
    }

    /// Card figures for each ranked contract
    pub fn recommendations(&self, ranked: &[EnrichedContract], spot: f64) -> Vec<Recommendation> {
        ranked
            .iter()
            .cloned()
            .map(|e| Recommendation::new(e, spot, &self.config.ranker))
            .collect()
    }

    /// Heatmap grid and axis domains for a point set
    ///
    /// Uses the configured resolution when none is given.
    pub fn compute_heatmap<'a, P: HeatPoint>(
        &self,
        points: &'a [P],
        spot: f64,
        viewport: Viewport,
        resolution: Option<GridResolution>,
    ) -> Heatmap<'a, P> {
        let resolution =
            resolution.unwrap_or_else(|| GridResolution::from_config(&self.config.heatmap));
        heatmap::compute_heatmap(points, spot, viewport, resolution, &self.config.heatmap)
    }
}
