//! Threshold rule table and per-cycle RSI snapshot

use crate::models::market::Timeframe;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Inclusive `[min, max]` bound
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub min: f64,
    pub max: f64,
}

impl Bound {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}

/// Parses `min..max`
impl FromStr for Bound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (min, max) = s
            .trim()
            .split_once("..")
            .ok_or_else(|| format!("expected 'min..max', got '{}'", s.trim()))?;
        let min: f64 = min
            .trim()
            .parse()
            .map_err(|e| format!("invalid lower bound '{}': {}", min.trim(), e))?;
        let max: f64 = max
            .trim()
            .parse()
            .map_err(|e| format!("invalid upper bound '{}': {}", max.trim(), e))?;
        if !min.is_finite() || !max.is_finite() {
            return Err("bounds must be finite".to_string());
        }
        if min > max {
            return Err(format!("lower bound {} exceeds upper bound {}", min, max));
        }
        Ok(Bound { min, max })
    }
}

/// RSI bound for one timeframe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub timeframe: Timeframe,
    pub bound: Bound,
}

/// The full rule table a symbol must satisfy to signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<ThresholdRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change: Option<Bound>,
}

impl RuleSet {
    pub fn new(rules: Vec<ThresholdRule>) -> Self {
        Self {
            rules,
            price_change: None,
        }
    }

    pub fn with_price_change(mut self, bound: Bound) -> Self {
        self.price_change = Some(bound);
        self
    }

    /// Timeframes referenced by the table, fastest first
    pub fn timeframes(&self) -> Vec<Timeframe> {
        let mut timeframes: Vec<Timeframe> = self.rules.iter().map(|r| r.timeframe).collect();
        timeframes.sort();
        timeframes.dedup();
        timeframes
    }

    pub fn fastest_timeframe(&self) -> Option<Timeframe> {
        self.rules.iter().map(|r| r.timeframe).min()
    }

    /// Parses `tf:min..max` entries separated by commas, e.g. `4h:45..70,1m:30..50`
    pub fn parse_rules(s: &str) -> Result<Vec<ThresholdRule>, String> {
        let mut rules = Vec::new();
        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (tf, bound) = entry
                .split_once(':')
                .ok_or_else(|| format!("expected 'timeframe:min..max', got '{}'", entry))?;
            let timeframe: Timeframe = tf.parse()?;
            let bound: Bound = bound.parse()?;
            if rules.iter().any(|r: &ThresholdRule| r.timeframe == timeframe) {
                return Err(format!("duplicate timeframe '{}'", timeframe));
            }
            rules.push(ThresholdRule { timeframe, bound });
        }
        if rules.is_empty() {
            return Err("at least one rule is required".to_string());
        }
        Ok(rules)
    }
}

impl Default for RuleSet {
    /// 1d [0,100], 4h [45,70], 15m [0,80], 1m [30,50], no change gate
    fn default() -> Self {
        RuleSet::new(vec![
            ThresholdRule {
                timeframe: Timeframe::D1,
                bound: Bound::new(0.0, 100.0),
            },
            ThresholdRule {
                timeframe: Timeframe::H4,
                bound: Bound::new(45.0, 70.0),
            },
            ThresholdRule {
                timeframe: Timeframe::M15,
                bound: Bound::new(0.0, 80.0),
            },
            ThresholdRule {
                timeframe: Timeframe::M1,
                bound: Bound::new(30.0, 50.0),
            },
        ])
    }
}

/// RSI value per timeframe for one symbol in one cycle. `None` means the
/// series was too short to compute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RsiSnapshot {
    values: BTreeMap<Timeframe, Option<f64>>,
}

impl RsiSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, timeframe: Timeframe, value: Option<f64>) {
        self.values.insert(timeframe, value);
    }

    pub fn with(mut self, timeframe: Timeframe, value: Option<f64>) -> Self {
        self.insert(timeframe, value);
        self
    }

    /// Flattened lookup: missing timeframe and missing value both yield `None`
    pub fn get(&self, timeframe: Timeframe) -> Option<f64> {
        self.values.get(&timeframe).copied().flatten()
    }

    /// Entries slowest timeframe first, the order alerts list them in
    pub fn iter(&self) -> impl Iterator<Item = (Timeframe, Option<f64>)> + '_ {
        self.values.iter().rev().map(|(tf, v)| (*tf, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// `1d=55.20;4h=61.03;...`, absent values rendered as `-`
impl fmt::Display for RsiSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (tf, value) in self.iter() {
            if !first {
                f.write_str(";")?;
            }
            first = false;
            match value {
                Some(v) => write!(f, "{}={:.2}", tf, v)?,
                None => write!(f, "{}=-", tf)?,
            }
        }
        Ok(())
    }
}
