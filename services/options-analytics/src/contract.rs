//! Contract normalization
//!
//! Turns loosely typed feed records into canonical [`Contract`] values.
//! Failures are per record: a bad strike or expiry rejects that record and
//! the rest of the batch carries on.

use crate::config::NormalizerConfig;
use crate::error::ContractRejection;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

// ============================================================================
// CANONICAL CONTRACT
// ============================================================================

/// Option type for derivatives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// Call option - right to buy the underlying at strike price
    Call,
    /// Put option - right to sell the underlying at strike price
    Put,
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "call"),
            OptionType::Put => write!(f, "put"),
        }
    }
}

impl FromStr for OptionType {
    type Err = ContractRejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(OptionType::Call),
            "put" | "p" => Ok(OptionType::Put),
            _ => Err(ContractRejection::UnknownType),
        }
    }
}

/// Canonical option contract after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    /// Exchange symbol, when the feed carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Strike price, always positive
    pub strike: f64,
    /// Mark price used as the premium
    pub mark_price: f64,
    /// Implied volatility in percent
    pub iv: Option<f64>,
    /// Signed delta, positive for calls
    pub delta: Option<f64>,
    /// Gamma, passed through
    pub gamma: Option<f64>,
    /// Theta, passed through
    pub theta: Option<f64>,
    /// Best bid
    pub bid: Option<f64>,
    /// Best ask
    pub ask: Option<f64>,
    /// Traded volume
    pub volume: f64,
    /// Open interest
    pub open_interest: f64,
    /// Call or put
    #[serde(rename = "type")]
    pub kind: OptionType,
    /// Expiry date, used only as a grouping key
    pub expiry: NaiveDate,
    /// Volume change over the trailing window, percent
    pub volume_change: f64,
    /// Open interest change over the trailing window, percent
    pub oi_change: f64,
}

impl Contract {
    /// Bare contract with every optional field absent and counters at zero
    pub fn new(kind: OptionType, strike: f64, mark_price: f64, expiry: NaiveDate) -> Self {
        Self {
            symbol: None,
            strike,
            mark_price,
            iv: None,
            delta: None,
            gamma: None,
            theta: None,
            bid: None,
            ask: None,
            volume: 0.0,
            open_interest: 0.0,
            kind,
            expiry,
            volume_change: 0.0,
            oi_change: 0.0,
        }
    }

    /// Set delta
    #[must_use]
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = Some(delta);
        self
    }

    /// Set volume
    #[must_use]
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    /// Set the trailing volume and open interest changes
    #[must_use]
    pub fn with_changes(mut self, volume_change: f64, oi_change: f64) -> Self {
        self.volume_change = volume_change;
        self.oi_change = oi_change;
        self
    }

    /// Absolute distance of the strike from spot
    pub fn distance_from(&self, spot: f64) -> f64 {
        (self.strike - spot).abs()
    }

    /// Intrinsic value at the given spot
    pub fn intrinsic_value(&self, spot: f64) -> f64 {
        match self.kind {
            OptionType::Call => (spot - self.strike).max(0.0),
            OptionType::Put => (self.strike - spot).max(0.0),
        }
    }

    /// Copy with missing delta and gamma estimated from moneyness
    ///
    /// Supplied greeks are never overwritten. A non-positive or non-finite
    /// spot leaves the contract unchanged.
    #[must_use]
    pub fn with_estimated_greeks(&self, spot: f64) -> Self {
        let mut estimated = self.clone();
        if !spot.is_finite() || spot <= 0.0 {
            return estimated;
        }

        let strike = self.strike;
        if estimated.delta.is_none() {
            let delta = match self.kind {
                OptionType::Call if strike < spot => {
                    0.9 - 0.4 * ((strike / spot).min(1.0) - 0.6)
                }
                OptionType::Call => (0.5 - 0.5 * (strike - spot) / spot).max(0.05),
                OptionType::Put if strike > spot => {
                    -0.9 + 0.4 * ((spot / strike).max(0.6) - 0.6)
                }
                OptionType::Put => (-0.5 + 0.5 * (spot - strike) / spot).min(-0.05),
            };
            estimated.delta = Some(delta.clamp(-1.0, 1.0));
        }
        if estimated.gamma.is_none() {
            let d = (strike - spot).abs() / spot;
            estimated.gamma = Some((0.01 * (-5.0 * d * d).exp()).max(0.0001));
        }
        estimated
    }
}

/// Anything that can be placed on the strike x premium plane
pub trait HeatPoint {
    /// Horizontal coordinate
    fn strike(&self) -> f64;
    /// Vertical coordinate
    fn premium(&self) -> f64;
}

impl HeatPoint for Contract {
    fn strike(&self) -> f64 {
        self.strike
    }

    fn premium(&self) -> f64 {
        self.mark_price
    }
}

/// Minimal point for callers that only have strike and premium
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    /// Strike price
    pub strike: f64,
    /// Mark price
    pub mark_price: f64,
}

impl PricePoint {
    /// Create a point
    pub fn new(strike: f64, mark_price: f64) -> Self {
        Self { strike, mark_price }
    }
}

impl HeatPoint for PricePoint {
    fn strike(&self) -> f64 {
        self.strike
    }

    fn premium(&self) -> f64 {
        self.mark_price
    }
}

// ============================================================================
// RAW FEED RECORD
// ============================================================================

/// Loosely typed record as delivered by a feed
///
/// Accepts both canonical names and exchange ticker names. Numeric fields
/// may be numbers or numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContract {
    /// Exchange symbol, e.g. `BTC-30MAY25-95000-C`
    pub symbol: Option<Value>,
    /// Strike (`strikePrice` on exchange feeds)
    #[serde(alias = "strikePrice")]
    pub strike: Option<Value>,
    /// Mark price
    pub mark_price: Option<Value>,
    /// Implied volatility (`markIv` on exchange feeds)
    #[serde(alias = "markIv")]
    pub iv: Option<Value>,
    /// Delta
    pub delta: Option<Value>,
    /// Gamma
    pub gamma: Option<Value>,
    /// Theta
    pub theta: Option<Value>,
    /// Best bid (`bid1Price`)
    #[serde(alias = "bid1Price")]
    pub bid: Option<Value>,
    /// Best ask (`ask1Price`)
    #[serde(alias = "ask1Price")]
    pub ask: Option<Value>,
    /// Volume (`volume24h`)
    #[serde(alias = "volume24h")]
    pub volume: Option<Value>,
    /// Open interest
    pub open_interest: Option<Value>,
    /// `call`/`put` (`optionsType`)
    #[serde(rename = "type", alias = "optionsType")]
    pub kind: Option<Value>,
    /// Expiry as `YYYY-MM-DD` (`deliveryDate`)
    #[serde(alias = "deliveryDate")]
    pub expiry: Option<Value>,
    /// Delivery time in Unix milliseconds
    pub delivery_time: Option<Value>,
    /// Volume change, percent
    pub volume_change: Option<Value>,
    /// Open interest change, percent
    pub oi_change: Option<Value>,
}

impl From<&Contract> for RawContract {
    fn from(contract: &Contract) -> Self {
        let number = |v: f64| Some(Value::from(v));
        let optional = |v: Option<f64>| v.map(Value::from);
        Self {
            symbol: contract.symbol.clone().map(Value::from),
            strike: number(contract.strike),
            mark_price: number(contract.mark_price),
            iv: optional(contract.iv),
            delta: optional(contract.delta),
            gamma: optional(contract.gamma),
            theta: optional(contract.theta),
            bid: optional(contract.bid),
            ask: optional(contract.ask),
            volume: number(contract.volume),
            open_interest: number(contract.open_interest),
            kind: Some(Value::from(contract.kind.to_string())),
            expiry: Some(Value::from(contract.expiry.format("%Y-%m-%d").to_string())),
            delivery_time: None,
            volume_change: number(contract.volume_change),
            oi_change: number(contract.oi_change),
        }
    }
}

/// Parse a number or numeric string, keeping only finite values
pub fn coerce_number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_negative_or_zero(value: Option<&Value>) -> f64 {
    coerce_number(value).filter(|v| *v >= 0.0).unwrap_or(0.0)
}

fn is_digits(segment: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&segment.len()) && segment.bytes().all(|b| b.is_ascii_digit())
}

fn type_segment(segment: &str) -> Option<OptionType> {
    match segment {
        "C" => Some(OptionType::Call),
        "P" => Some(OptionType::Put),
        _ => None,
    }
}

/// Strike and type encoded in an exchange symbol like `BTC-30MAY25-95000-C`
///
/// The strike is the first run of at least four digits between dashes that
/// precedes the `C`/`P` segment, optionally separated from it by a one or two
/// digit series number.
pub fn parse_symbol(symbol: &str) -> Option<(f64, OptionType)> {
    let segments: Vec<&str> = symbol.trim().split('-').collect();
    for (i, segment) in segments.iter().enumerate().skip(2) {
        let Some(kind) = type_segment(segment) else {
            continue;
        };
        let previous = segments[i - 1];
        let strike_segment = if is_digits(previous, 4, usize::MAX) {
            Some(previous)
        } else if i >= 3 && is_digits(previous, 1, 2) && is_digits(segments[i - 2], 4, usize::MAX) {
            Some(segments[i - 2])
        } else {
            None
        };
        if let Some(strike) = strike_segment.and_then(|s| s.parse::<f64>().ok()) {
            return Some((strike, kind));
        }
    }
    None
}

/// Option type from a symbol's `-C`/`-P` segment, even when no strike parses
fn symbol_type(symbol: &str) -> Option<OptionType> {
    symbol.trim().split('-').skip(1).find_map(type_segment)
}

impl RawContract {
    fn symbol_text(&self) -> Option<String> {
        self.symbol.as_ref().map(value_text).filter(|s| !s.trim().is_empty())
    }

    fn resolve_strike(&self) -> Result<f64, ContractRejection> {
        let strike = match &self.strike {
            Some(raw) => coerce_number(Some(raw))
                .ok_or_else(|| ContractRejection::NonNumericStrike(value_text(raw)))?,
            None => self
                .symbol_text()
                .and_then(|s| parse_symbol(&s))
                .map(|(strike, _)| strike)
                .ok_or(ContractRejection::MissingStrike)?,
        };
        if strike <= 0.0 {
            return Err(ContractRejection::NonPositiveStrike(strike));
        }
        Ok(strike)
    }

    fn resolve_expiry(&self) -> Result<NaiveDate, ContractRejection> {
        if let Some(raw) = &self.expiry {
            let text = value_text(raw);
            let trimmed = text.trim();
            return NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .or_else(|| {
                    DateTime::parse_from_rfc3339(trimmed)
                        .ok()
                        .map(|dt| dt.date_naive())
                })
                .ok_or(ContractRejection::InvalidExpiry(text));
        }
        if let Some(raw) = &self.delivery_time {
            return coerce_number(Some(raw))
                .filter(|ms| ms.fract() == 0.0)
                .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
                .map(|dt| dt.date_naive())
                .ok_or_else(|| ContractRejection::InvalidExpiry(value_text(raw)));
        }
        Err(ContractRejection::MissingExpiry)
    }

    fn declared_type(&self) -> Result<Option<OptionType>, ContractRejection> {
        if let Some(raw) = &self.kind {
            return value_text(raw).parse().map(Some);
        }
        Ok(self.symbol_text().and_then(|s| symbol_type(&s)))
    }
}

// ============================================================================
// NORMALIZER
// ============================================================================

/// Normalize a record expected to be of the given type
///
/// A record without any type information takes the expected type. A record
/// declaring the other type is rejected.
pub fn normalize_contract(
    raw: &RawContract,
    expected: OptionType,
    config: &NormalizerConfig,
) -> Result<Contract, ContractRejection> {
    let kind = match raw.declared_type()? {
        Some(found) if found != expected => {
            return Err(ContractRejection::TypeMismatch { expected, found });
        }
        _ => expected,
    };
    build_contract(raw, kind, config)
}

/// Normalize a record whose type must come from the record itself
pub fn normalize_record(
    raw: &RawContract,
    config: &NormalizerConfig,
) -> Result<Contract, ContractRejection> {
    let kind = raw.declared_type()?.ok_or(ContractRejection::UnknownType)?;
    build_contract(raw, kind, config)
}

fn build_contract(
    raw: &RawContract,
    kind: OptionType,
    config: &NormalizerConfig,
) -> Result<Contract, ContractRejection> {
    let strike = raw.resolve_strike()?;
    let expiry = raw.resolve_expiry()?;
    let optional = |v: &Option<Value>| coerce_number(v.as_ref());

    Ok(Contract {
        symbol: raw.symbol_text(),
        strike,
        mark_price: non_negative_or_zero(raw.mark_price.as_ref()),
        iv: optional(&raw.iv)
            .map(|iv| iv * config.iv_scale)
            .filter(|iv| iv.is_finite()),
        delta: optional(&raw.delta),
        gamma: optional(&raw.gamma),
        theta: optional(&raw.theta),
        bid: optional(&raw.bid),
        ask: optional(&raw.ask),
        volume: non_negative_or_zero(raw.volume.as_ref()),
        open_interest: non_negative_or_zero(raw.open_interest.as_ref()),
        kind,
        expiry,
        volume_change: optional(&raw.volume_change).unwrap_or(0.0),
        oi_change: optional(&raw.oi_change).unwrap_or(0.0),
    })
}

/// Normalized chain split by type
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedChain {
    /// Call contracts in input order
    pub calls: Vec<Contract>,
    /// Put contracts in input order
    pub puts: Vec<Contract>,
    /// Sorted unique expiry dates across both sides
    pub expirations: Vec<NaiveDate>,
    /// Number of records that failed normalization
    pub rejected: usize,
}

impl NormalizedChain {
    /// Contracts of one side
    pub fn side(&self, kind: OptionType) -> &[Contract] {
        match kind {
            OptionType::Call => &self.calls,
            OptionType::Put => &self.puts,
        }
    }

    /// Number of accepted contracts
    pub fn len(&self) -> usize {
        self.calls.len() + self.puts.len()
    }

    /// True when no record was accepted
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.puts.is_empty()
    }
}

/// Normalize a batch, skipping and logging records that fail
pub fn normalize_chain(raws: &[RawContract], config: &NormalizerConfig) -> NormalizedChain {
    let mut chain = NormalizedChain::default();

    for (index, raw) in raws.iter().enumerate() {
        match normalize_record(raw, config) {
            Ok(contract) => match contract.kind {
                OptionType::Call => chain.calls.push(contract),
                OptionType::Put => chain.puts.push(contract),
            },
            Err(rejection) => {
                chain.rejected += 1;
                warn!(index, symbol = ?raw.symbol_text(), %rejection, "Skipping contract");
            }
        }
    }

    let mut expirations: Vec<NaiveDate> = chain
        .calls
        .iter()
        .chain(chain.puts.iter())
        .map(|c| c.expiry)
        .collect();
    expirations.sort_unstable();
    expirations.dedup();
    chain.expirations = expirations;

    debug!(
        calls = chain.calls.len(),
        puts = chain.puts.len(),
        rejected = chain.rejected,
        "Normalized chain"
    );
    chain
}
