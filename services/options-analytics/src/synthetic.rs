//! Deterministic synthetic option chains
//!
//! Produces exchange-style raw records around a spot so the whole pipeline
//! can be exercised without a feed. The same seed always yields the same
//! chain.

use crate::contract::{OptionType, RawContract};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use serde_json::Value;

/// Seeded generator of a BTC-style option chain
#[derive(Debug, Clone)]
pub struct ChainGenerator {
    /// Underlying spot price
    pub spot: f64,
    /// Random seed for reproducible chains
    pub random_seed: u64,
    /// Date the first expiry is counted from
    pub start: NaiveDate,
    /// Number of expiries
    pub expiries: usize,
    /// Days between consecutive expiries
    pub expiry_spacing_days: i64,
    /// Distance between strikes
    pub strike_step: f64,
    /// Strikes on each side of the at-the-money strike
    pub strikes_per_side: usize,
    /// At-the-money implied volatility, percent
    pub base_iv: f64,
}

impl ChainGenerator {
    /// Generator with a three-expiry chain of thirteen strikes around `spot`
    pub fn new(spot: f64, random_seed: u64) -> Self {
        Self {
            spot,
            random_seed,
            start: NaiveDate::from_ymd_opt(2025, 5, 2).unwrap_or_default(),
            expiries: 3,
            expiry_spacing_days: 28,
            strike_step: 5000.0,
            strikes_per_side: 6,
            base_iv: 50.0,
        }
    }

    /// Expiry dates of the chain
    pub fn expiry_dates(&self) -> Vec<NaiveDate> {
        (0..self.expiries)
            .map(|k| self.start + Duration::days(self.expiry_spacing_days * k as i64))
            .collect()
    }

    /// Strikes of the chain, all positive
    pub fn strikes(&self) -> Vec<f64> {
        let atm = (self.spot / self.strike_step).round() * self.strike_step;
        let side = self.strikes_per_side as i64;
        (-side..=side)
            .map(|i| atm + i as f64 * self.strike_step)
            .filter(|k| *k > 0.0)
            .collect()
    }

    /// Generate raw records, calls and puts for every expiry and strike
    pub fn generate(&self) -> Vec<RawContract> {
        let mut rng = StdRng::seed_from_u64(self.random_seed);
        let strikes = self.strikes();
        let mut records = Vec::with_capacity(self.expiries * strikes.len() * 2);

        for (k, expiry) in self.expiry_dates().into_iter().enumerate() {
            let years = (self.expiry_spacing_days * (k as i64 + 1)) as f64 / 365.0;
            for &strike in &strikes {
                for kind in [OptionType::Call, OptionType::Put] {
                    records.push(self.record(&mut rng, strike, kind, expiry, years));
                }
            }
        }
        records
    }

    fn record(
        &self,
        rng: &mut StdRng,
        strike: f64,
        kind: OptionType,
        expiry: NaiveDate,
        years: f64,
    ) -> RawContract {
        let z: f64 = StandardNormal.sample(rng);
        let moneyness = (self.spot / strike).ln();
        let iv = (self.base_iv + 40.0 * moneyness * moneyness + 1.5 * z).max(5.0);
        let sigma_t = iv / 100.0 * years.sqrt();

        // Logistic stand-in for N(d1); good enough for a plausible chain
        let call_delta = 1.0 / (1.0 + (-1.7 * moneyness / sigma_t).exp());
        let delta = match kind {
            OptionType::Call => call_delta,
            OptionType::Put => call_delta - 1.0,
        };

        let intrinsic = match kind {
            OptionType::Call => (self.spot - strike).max(0.0),
            OptionType::Put => (strike - self.spot).max(0.0),
        };
        let noise: f64 = StandardNormal.sample(rng);
        let time_value = 0.4 * self.spot * sigma_t
            * (-moneyness * moneyness / (2.0 * sigma_t * sigma_t)).exp()
            * (1.0 + 0.05 * noise);
        let mark = (intrinsic + time_value.max(0.0)).max(5.0).round();

        let atm_weight = (-8.0 * moneyness * moneyness).exp();
        let volume = (rng.gen_range(50.0..300.0) + 600.0 * atm_weight).round();
        let open_interest = (volume * rng.gen_range(1.5..3.0)).round();

        let tag = match kind {
            OptionType::Call => "C",
            OptionType::Put => "P",
        };
        let symbol = format!(
            "BTC-{}-{}-{}",
            expiry.format("%d%b%y").to_string().to_uppercase(),
            strike,
            tag
        );
        let round4 = |v: f64| (v * 1e4).round() / 1e4;

        RawContract {
            symbol: Some(Value::from(symbol)),
            strike: Some(Value::from(strike.to_string())),
            mark_price: Some(Value::from(mark)),
            iv: Some(Value::from(round4(iv))),
            delta: Some(Value::from(round4(delta))),
            gamma: None,
            theta: None,
            bid: Some(Value::from((mark * 0.98).round())),
            ask: Some(Value::from((mark * 1.02).round())),
            volume: Some(Value::from(volume)),
            open_interest: Some(Value::from(open_interest)),
            kind: Some(Value::from(kind.to_string())),
            expiry: Some(Value::from(expiry.format("%Y-%m-%d").to_string())),
            delivery_time: None,
            volume_change: Some(Value::from(rng.gen_range(0.0..60.0_f64).round())),
            oi_change: Some(Value::from(rng.gen_range(0.0..30.0_f64).round())),
        }
    }
}
