//! Options Analytics CLI
//!
//! Thin shell over the analytics engine:
//! - `rank` scores a chain file and prints the recommended list
//! - `heatmap` prints the proximity grid, axis domains and chart overlays
//! - `demo` runs both on a seeded synthetic chain

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use options_analytics::heatmap::palette::{cell_background, cell_opacity, intensity_color};
use options_analytics::synthetic::ChainGenerator;
use options_analytics::{
    AnalyticsConfig, AnalyticsEngine, EnrichedContract, ExpiryFilter, GridResolution, Heatmap,
    NormalizedChain, OptionType, Overlay, RankOptions, RawContract, Viewport, WeightPreset,
};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Options chain analytics CLI
#[derive(Parser)]
#[clap(name = "options-analytics")]
#[clap(about = "Options chain scoring, ranking and proximity heatmaps")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// Configuration file (TOML, YAML or JSON)
    #[clap(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank one side of a chain into the recommended list
    Rank {
        /// Chain file, JSON array or CSV
        #[clap(long)]
        chain: PathBuf,

        /// Underlying spot price
        #[clap(long)]
        spot: f64,

        /// Side to rank
        #[clap(long = "type", default_value = "call")]
        kind: OptionType,

        /// Expiry date (YYYY-MM-DD) or "all"
        #[clap(long, default_value = "all")]
        expiry: ExpiryFilter,

        /// Weight preset (chart or service)
        #[clap(long)]
        preset: Option<WeightPreset>,

        /// Print only the top picks
        #[clap(long)]
        top_picks: bool,
    },

    /// Compute the heatmap grid, domains and overlays for one side
    Heatmap {
        /// Chain file, JSON array or CSV
        #[clap(long)]
        chain: PathBuf,

        /// Underlying spot price
        #[clap(long)]
        spot: f64,

        /// Side to plot
        #[clap(long = "type", default_value = "call")]
        kind: OptionType,

        /// Viewport width in pixels
        #[clap(long, default_value = "960")]
        width: f64,

        /// Viewport height in pixels
        #[clap(long, default_value = "600")]
        height: f64,

        /// Grid columns (configured value if omitted)
        #[clap(long)]
        cols: Option<usize>,

        /// Grid rows (configured value if omitted)
        #[clap(long)]
        rows: Option<usize>,

        /// Plot only the ranked subset
        #[clap(long)]
        ranked_only: bool,
    },

    /// Run ranking and heatmap on a synthetic chain
    Demo {
        /// Random seed
        #[clap(long, default_value = "42")]
        seed: u64,

        /// Underlying spot price
        #[clap(long, default_value = "93762.4")]
        spot: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config =
        AnalyticsConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config);
    let engine = AnalyticsEngine::new(config)?;

    let output = match cli.command {
        Commands::Rank {
            chain,
            spot,
            kind,
            expiry,
            preset,
            top_picks,
        } => {
            let chain = engine.ingest(&load_chain(&chain)?);
            let mut options = RankOptions::new(kind).with_expiry(expiry);
            if let Some(preset) = preset {
                options = options.with_preset(preset);
            }
            let ranked = engine.enrich_and_rank(chain.side(kind), spot, &options);
            let shown = if top_picks { engine.top_picks(&ranked) } else { &ranked[..] };
            info!(%kind, ranked = ranked.len(), shown = shown.len(), "Ranking complete");
            json!({
                "type": kind,
                "spot": spot,
                "expirations": chain.expirations,
                "rejected": chain.rejected,
                "recommendations": engine.recommendations(shown, spot),
            })
        }
        Commands::Heatmap {
            chain,
            spot,
            kind,
            width,
            height,
            cols,
            rows,
            ranked_only,
        } => {
            let chain = engine.ingest(&load_chain(&chain)?);
            let defaults = GridResolution::from_config(&engine.config().heatmap);
            let resolution = GridResolution {
                cols: cols.unwrap_or(defaults.cols),
                rows: rows.unwrap_or(defaults.rows),
            };
            let viewport = Viewport::new(width, height);
            heatmap_report(&engine, &chain, kind, spot, viewport, resolution, ranked_only)
        }
        Commands::Demo { seed, spot } => {
            let raws = ChainGenerator::new(spot, seed).generate();
            let chain = engine.ingest(&raws);
            let mut sides = serde_json::Map::new();
            for kind in [OptionType::Call, OptionType::Put] {
                let ranked =
                    engine.enrich_and_rank(chain.side(kind), spot, &RankOptions::new(kind));
                let heatmap = heatmap_report(
                    &engine,
                    &chain,
                    kind,
                    spot,
                    Viewport::default(),
                    GridResolution::from_config(&engine.config().heatmap),
                    false,
                );
                let summary: serde_json::Map<String, Value> =
                    ["status", "strikeDomain", "premiumDomain"]
                        .into_iter()
                        .map(|key| (key.to_string(), heatmap[key].clone()))
                        .chain([(
                            "deltaGuides".to_string(),
                            heatmap["overlay"]["deltaGuides"].clone(),
                        )])
                        .collect();
                let top = engine.recommendations(engine.top_picks(&ranked), spot);
                sides.insert(
                    kind.to_string(),
                    json!({ "topPicks": top, "ranked": ranked.len(), "heatmap": summary }),
                );
            }
            json!({ "seed": seed, "spot": spot, "expirations": chain.expirations, "sides": sides })
        }
    };

    let stdout = std::io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), &output).context("Failed to write output")?;
    println!();
    Ok(())
}

fn init_tracing(config: &AnalyticsConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Read a chain file, CSV by extension and JSON otherwise
fn load_chain(path: &Path) -> Result<Vec<RawContract>> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open chain file {}", path.display()))?;
        reader
            .deserialize()
            .collect::<std::result::Result<Vec<RawContract>, _>>()
            .with_context(|| format!("Failed to parse CSV chain {}", path.display()))
    } else {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read chain file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON chain {}", path.display()))
    }
}

fn heatmap_report(
    engine: &AnalyticsEngine,
    chain: &NormalizedChain,
    kind: OptionType,
    spot: f64,
    viewport: Viewport,
    resolution: GridResolution,
    ranked_only: bool,
) -> Value {
    let enriched = engine.enrich(chain.side(kind), spot);
    let ranked = engine.enrich_and_rank(chain.side(kind), spot, &RankOptions::new(kind));
    let points: &[EnrichedContract] = if ranked_only { &ranked } else { &enriched };

    let heatmap = engine.compute_heatmap(points, spot, viewport, Some(resolution));
    let overlay = Overlay::build(&heatmap, points, &chain.calls, &ranked, spot);

    json!({
        "type": kind,
        "status": heatmap.status,
        "strikeDomain": heatmap.strike_domain,
        "premiumDomain": heatmap.premium_domain,
        "rows": heatmap.grid.rows,
        "cols": heatmap.grid.cols,
        "cells": grid_rows(&heatmap),
        "overlay": overlay,
    })
}

fn grid_rows(heatmap: &Heatmap<'_, EnrichedContract>) -> Vec<Vec<Value>> {
    (0..heatmap.grid.rows)
        .map(|row| {
            (0..heatmap.grid.cols)
                .filter_map(|col| heatmap.grid.cell(row, col))
                .map(|cell| {
                    json!({
                        "intensity": cell.intensity,
                        "nearest": cell.nearest.and_then(|e| e.contract.symbol.clone()),
                        "nearestIndex": cell.nearest_index,
                        "fill": intensity_color(cell.intensity),
                        "background": cell_background(cell.intensity),
                        "opacity": cell_opacity(cell.intensity),
                    })
                })
                .collect()
        })
        .collect()
}
