//! Unit tests for the rule-table evaluator

use rsi_watch::models::market::Timeframe;
use rsi_watch::models::rules::{Bound, RsiSnapshot, RuleSet, ThresholdRule};
use rsi_watch::signals::evaluator::SignalEvaluator;

fn two_rule_table() -> RuleSet {
    RuleSet::new(vec![
        ThresholdRule {
            timeframe: Timeframe::H4,
            bound: Bound::new(45.0, 70.0),
        },
        ThresholdRule {
            timeframe: Timeframe::M1,
            bound: Bound::new(30.0, 50.0),
        },
    ])
}

#[test]
fn test_all_inside_bounds() {
    let rsi = RsiSnapshot::new()
        .with(Timeframe::H4, Some(60.0))
        .with(Timeframe::M1, Some(40.0));
    assert!(SignalEvaluator::evaluate(&two_rule_table(), &rsi, None));
}

#[test]
fn test_bounds_are_inclusive() {
    let rules = two_rule_table();
    let low = RsiSnapshot::new()
        .with(Timeframe::H4, Some(45.0))
        .with(Timeframe::M1, Some(30.0));
    let high = RsiSnapshot::new()
        .with(Timeframe::H4, Some(70.0))
        .with(Timeframe::M1, Some(50.0));
    assert!(SignalEvaluator::evaluate(&rules, &low, None));
    assert!(SignalEvaluator::evaluate(&rules, &high, None));
}

#[test]
fn test_one_value_outside_fails() {
    let rsi = RsiSnapshot::new()
        .with(Timeframe::H4, Some(70.01))
        .with(Timeframe::M1, Some(40.0));
    assert!(!SignalEvaluator::evaluate(&two_rule_table(), &rsi, None));
}

#[test]
fn test_absent_rsi_fails_closed() {
    let rules = two_rule_table();
    let absent_value = RsiSnapshot::new()
        .with(Timeframe::H4, None)
        .with(Timeframe::M1, Some(40.0));
    let missing_timeframe = RsiSnapshot::new().with(Timeframe::M1, Some(40.0));
    assert!(!SignalEvaluator::evaluate(&rules, &absent_value, None));
    assert!(!SignalEvaluator::evaluate(&rules, &missing_timeframe, None));
    assert!(!SignalEvaluator::evaluate(&RuleSet::default(), &RsiSnapshot::new(), Some(1.0)));
}

#[test]
fn test_price_change_gate() {
    let rules = two_rule_table().with_price_change(Bound::new(-5.0, 10.0));
    let rsi = RsiSnapshot::new()
        .with(Timeframe::H4, Some(50.0))
        .with(Timeframe::M1, Some(35.0));

    assert!(SignalEvaluator::evaluate(&rules, &rsi, Some(-5.0)));
    assert!(SignalEvaluator::evaluate(&rules, &rsi, Some(10.0)));
    assert!(!SignalEvaluator::evaluate(&rules, &rsi, Some(10.5)));
    assert!(!SignalEvaluator::evaluate(&rules, &rsi, None));
}

#[test]
fn test_change_ignored_without_gate() {
    let rsi = RsiSnapshot::new()
        .with(Timeframe::H4, Some(50.0))
        .with(Timeframe::M1, Some(35.0));
    assert!(SignalEvaluator::evaluate(&two_rule_table(), &rsi, Some(250.0)));
}

#[test]
fn test_empty_table_never_signals() {
    let rsi = RsiSnapshot::new().with(Timeframe::M1, Some(40.0));
    assert!(!SignalEvaluator::evaluate(&RuleSet::new(Vec::new()), &rsi, None));
}
