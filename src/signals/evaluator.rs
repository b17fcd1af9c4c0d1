//! Rule-table evaluation of per-timeframe RSI values

use crate::models::rules::{RsiSnapshot, RuleSet};

pub struct SignalEvaluator;

impl SignalEvaluator {
    /// True when every rule's RSI lies inside its inclusive bound and, if the
    /// table carries a price-change gate, the 24h change lies inside it too.
    ///
    /// Any missing RSI (or a missing change percent while gated) fails closed.
    pub fn evaluate(rules: &RuleSet, rsi: &RsiSnapshot, price_change_percent: Option<f64>) -> bool {
        if rules.rules.is_empty() {
            return false;
        }

        for rule in &rules.rules {
            match rsi.get(rule.timeframe) {
                Some(value) if rule.bound.contains(value) => {}
                _ => return false,
            }
        }

        match rules.price_change {
            Some(bound) => price_change_percent.is_some_and(|change| bound.contains(change)),
            None => true,
        }
    }
}
