//! Unit tests for recommendation ranking
//!
//! Tests cover:
//! - Side and expiry filtering
//! - Spot distance and risk/reward rejection
//! - Volume ordering, stable ties and the result cap
//! - Recommendation card figures

use crate::generators::{call, deep_itm_calls, put, reference_calls, reference_puts};
use crate::utils::{SPOT, back_expiry, front_expiry, init_test_env};
use approx::assert_relative_eq;
use options_analytics::config::{AlertThresholds, RankerConfig, ScoringConfig};
use options_analytics::enrich::enrich_all;
use options_analytics::ranker::{rank, risk_reward, time_value_pct, top_picks};
use options_analytics::{
    Contract, EnrichedContract, ExpiryFilter, OptionType, RankOptions, Recommendation, RiskLevel,
    RiskReward,
};
use rstest::*;

fn enriched(contracts: &[Contract]) -> Vec<EnrichedContract> {
    enrich_all(
        contracts,
        SPOT,
        &ScoringConfig::default(),
        &AlertThresholds::default(),
    )
}

fn strikes(ranked: &[EnrichedContract]) -> Vec<f64> {
    ranked.iter().map(|e| e.contract.strike).collect()
}

#[fixture]
fn config() -> RankerConfig {
    RankerConfig::default()
}

#[fixture]
fn chain() -> Vec<EnrichedContract> {
    let mut contracts = reference_calls();
    contracts.extend(reference_puts());
    enriched(&contracts)
}

#[rstest]
fn test_reference_calls_rank(chain: Vec<EnrichedContract>, config: RankerConfig) {
    init_test_env();
    let ranked = rank(&chain, SPOT, &RankOptions::new(OptionType::Call), &config);
    // 70000 is beyond 20% of spot, 95000 and above have too much time value
    assert_eq!(strikes(&ranked), vec![90000.0, 80000.0]);
}

#[rstest]
fn test_reference_puts_rank(chain: Vec<EnrichedContract>, config: RankerConfig) {
    let ranked = rank(&chain, SPOT, &RankOptions::new(OptionType::Put), &config);
    assert_eq!(strikes(&ranked), vec![100000.0, 110000.0]);
    assert!(ranked.iter().all(|e| e.contract.kind == OptionType::Put));
}

#[rstest]
#[case(90000.0, 7500.0, 0.65, 65.0 - 3737.6 / 7500.0 * 100.0)]
#[case(95000.0, 4600.0, 0.45, -55.0)]
#[case(80000.0, 14800.0, 0.86, 86.0 - 1037.6 / 14800.0 * 100.0)]
fn test_call_risk_reward(
    #[case] strike: f64,
    #[case] mark: f64,
    #[case] delta: f64,
    #[case] expected: f64,
) {
    let contract = call(strike, mark, delta, 0.0);
    let rr = risk_reward(&contract, SPOT).expect("delta present");
    assert_relative_eq!(rr, expected, epsilon = 1e-6);
}

#[test]
fn test_put_risk_reward_uses_put_intrinsic() {
    let contract = put(95000.0, 5200.0, -0.55, 0.0);
    let tvp = (5200.0 - 1237.6) / 5200.0 * 100.0;
    assert_relative_eq!(time_value_pct(&contract, SPOT), tvp, epsilon = 1e-6);
    assert_relative_eq!(
        risk_reward(&contract, SPOT).expect("delta present"),
        55.0 - tvp,
        epsilon = 1e-6
    );
}

#[test]
fn test_time_value_pct_guards_tiny_marks() {
    let worthless = call(120000.0, 0.0, 0.01, 0.0);
    assert_eq!(time_value_pct(&worthless, SPOT), 0.0);

    let half = call(120000.0, 0.5, 0.01, 0.0);
    assert_relative_eq!(time_value_pct(&half, SPOT), 50.0, epsilon = 1e-9);
}

#[rstest]
fn test_expiry_filter(config: RankerConfig) {
    let mut contracts = reference_calls();
    let mut back = call(90000.0, 7600.0, 0.66, 630.0);
    back.expiry = back_expiry();
    contracts.push(back);
    let chain = enriched(&contracts);

    let all = rank(&chain, SPOT, &RankOptions::new(OptionType::Call), &config);
    assert_eq!(strikes(&all), vec![90000.0, 90000.0, 80000.0]);
    assert_eq!(all[0].contract.expiry, back_expiry());

    let front = RankOptions::new(OptionType::Call).with_expiry(ExpiryFilter::On(front_expiry()));
    let ranked = rank(&chain, SPOT, &front, &config);
    assert!(ranked.iter().all(|e| e.contract.expiry == front_expiry()));
    assert_eq!(ranked.len(), 2);

    let back_only = RankOptions::new(OptionType::Call).with_expiry(ExpiryFilter::On(back_expiry()));
    let ranked = rank(&chain, SPOT, &back_only, &config);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].contract.mark_price, 7600.0);
}

#[rstest]
fn test_missing_delta_rejected_by_default(config: RankerConfig) {
    let bare = Contract::new(OptionType::Call, 80000.0, 14800.0, front_expiry()).with_volume(999.0);
    let chain = enriched(&[bare]);
    assert!(rank(&chain, SPOT, &RankOptions::new(OptionType::Call), &config).is_empty());
}

#[test]
fn test_missing_delta_scored_on_time_value_when_allowed() {
    let config = RankerConfig {
        reject_missing_delta: false,
        ..RankerConfig::default()
    };
    // Time value 7%: -7 clears the poor threshold
    let mostly_intrinsic =
        Contract::new(OptionType::Call, 80000.0, 14800.0, front_expiry()).with_volume(999.0);
    // Pure time value: -100 does not
    let all_time_value =
        Contract::new(OptionType::Call, 100000.0, 2400.0, front_expiry()).with_volume(999.0);
    let chain = enriched(&[mostly_intrinsic, all_time_value]);

    let ranked = rank(&chain, SPOT, &RankOptions::new(OptionType::Call), &config);
    assert_eq!(strikes(&ranked), vec![80000.0]);
}

#[rstest]
fn test_result_cap_and_volume_order(config: RankerConfig) {
    let chain = enriched(&deep_itm_calls(20, SPOT));
    let ranked = rank(&chain, SPOT, &RankOptions::new(OptionType::Call), &config);

    assert_eq!(ranked.len(), 15);
    assert_eq!(ranked[0].contract.volume, 119.0);
    assert!(
        ranked
            .windows(2)
            .all(|w| w[0].contract.volume >= w[1].contract.volume)
    );
    assert_eq!(top_picks(&ranked, &config).len(), 4);
    assert_eq!(top_picks(&ranked[..2], &config).len(), 2);
}

#[rstest]
fn test_volume_ties_keep_input_order(config: RankerConfig) {
    let contracts = vec![
        call(80000.0, 14800.0, 0.86, 500.0),
        call(85000.0, 9900.0, 0.8, 700.0),
        call(90000.0, 7500.0, 0.65, 500.0),
    ];
    let ranked = rank(
        &enriched(&contracts),
        SPOT,
        &RankOptions::new(OptionType::Call),
        &config,
    );
    assert_eq!(strikes(&ranked), vec![85000.0, 80000.0, 90000.0]);
}

#[rstest]
fn test_non_finite_volume_sorts_last(config: RankerConfig) {
    let contracts = vec![
        call(80000.0, 14800.0, 0.86, f64::NAN),
        call(90000.0, 7500.0, 0.65, 10.0),
    ];
    let ranked = rank(
        &enriched(&contracts),
        SPOT,
        &RankOptions::new(OptionType::Call),
        &config,
    );
    assert_eq!(strikes(&ranked), vec![90000.0, 80000.0]);
}

#[rstest]
#[case(0.0)]
#[case(-1.0)]
#[case(f64::NAN)]
fn test_unusable_spot_ranks_nothing(
    chain: Vec<EnrichedContract>,
    config: RankerConfig,
    #[case] spot: f64,
) {
    assert!(rank(&chain, spot, &RankOptions::new(OptionType::Call), &config).is_empty());
}

#[rstest]
fn test_empty_input(config: RankerConfig) {
    assert!(rank(&[], SPOT, &RankOptions::new(OptionType::Put), &config).is_empty());
}

#[rstest]
#[case(15.2, RiskReward::Good)]
#[case(10.0, RiskReward::Neutral)]
#[case(-10.0, RiskReward::Neutral)]
#[case(-21.2, RiskReward::Poor)]
fn test_risk_reward_classes(config: RankerConfig, #[case] rr: f64, #[case] expected: RiskReward) {
    assert_eq!(RiskReward::classify(rr, &config), expected);
}

#[rstest]
fn test_recommendation_figures(chain: Vec<EnrichedContract>, config: RankerConfig) {
    let ranked = rank(&chain, SPOT, &RankOptions::new(OptionType::Call), &config);
    let cards: Vec<Recommendation> = ranked
        .into_iter()
        .map(|e| Recommendation::new(e, SPOT, &config))
        .collect();

    let atm = &cards[0];
    assert_eq!(atm.enriched.contract.strike, 90000.0);
    assert_eq!(atm.risk_reward, Some(RiskReward::Good));
    assert_eq!(atm.risk_level, RiskLevel::Medium);
    assert_relative_eq!(
        atm.estimated_return_pct.expect("delta present"),
        0.65 * SPOT * 0.01 / 7500.0 * 100.0,
        epsilon = 1e-9
    );

    let deep = &cards[1];
    assert_eq!(deep.risk_level, RiskLevel::Low);
    assert_eq!(deep.risk_reward, Some(RiskReward::Good));
}

#[test]
fn test_recommendation_without_delta() {
    let bare = Contract::new(OptionType::Put, 100000.0, 8600.0, front_expiry());
    let card = Recommendation::new(enriched(&[bare]).remove(0), SPOT, &RankerConfig::default());
    assert_eq!(card.risk_reward, None);
    assert_eq!(card.risk_level, RiskLevel::Medium);
    assert_eq!(card.estimated_return_pct, None);
}

#[test]
fn test_rank_options_deserialize() {
    let options: RankOptions =
        serde_json::from_str(r#"{"type":"put","weightPreset":"service"}"#).expect("valid options");
    assert_eq!(options.kind, OptionType::Put);
    assert_eq!(options.expiry, ExpiryFilter::All);
    assert!(options.weight_preset.is_some());
}
