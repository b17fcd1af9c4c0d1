//! Unit tests for the position state machine

use chrono::{DateTime, Duration, TimeZone, Utc};
use rsi_watch::models::market::Timeframe;
use rsi_watch::models::position::{MessageHandle, NotificationRef};
use rsi_watch::models::rules::RsiSnapshot;
use rsi_watch::positions::tracker::{
    CompletionRetry, Entry, Observation, OpenRejected, PositionTracker, DEFAULT_TARGET_MARKUP,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn entry(symbol: &str, price: f64, time: DateTime<Utc>) -> Entry {
    Entry {
        symbol: symbol.to_string(),
        price,
        time,
        rsi: RsiSnapshot::new().with(Timeframe::M1, Some(42.0)),
        reference_price: None,
    }
}

fn delivered(chats: &[&str]) -> Vec<NotificationRef> {
    chats
        .iter()
        .enumerate()
        .map(|(i, chat)| NotificationRef {
            chat_id: chat.to_string(),
            handle: MessageHandle(100 + i as i64),
        })
        .collect()
}

fn tracker() -> PositionTracker {
    PositionTracker::new(DEFAULT_TARGET_MARKUP, Duration::minutes(30))
}

#[test]
fn test_open_sets_target_and_lowest() {
    let mut tracker = tracker();
    let position = tracker.open(entry("BTCUSDT", 100.0, t0()), delivered(&["1"])).unwrap();

    assert!((position.target_price - 101.1).abs() < 1e-9);
    assert_eq!(position.lowest_price, 100.0);
    assert_eq!(position.entry_time, t0());
    assert_eq!(position.notifications[0].handle, MessageHandle(100));
    assert!(tracker.is_open("BTCUSDT"));
    assert_eq!(tracker.cooldowns().last_signal("BTCUSDT"), Some(t0()));
}

#[test]
fn test_open_requires_delivered_alert() {
    let mut tracker = tracker();
    let result = tracker.open(entry("BTCUSDT", 100.0, t0()), Vec::new());

    assert_eq!(result.unwrap_err(), OpenRejected::NotNotified("BTCUSDT".to_string()));
    assert!(tracker.is_empty());
    assert!(tracker.cooldowns().last_signal("BTCUSDT").is_none());
}

#[test]
fn test_open_rejects_bad_price() {
    let mut tracker = tracker();
    assert!(matches!(
        tracker.open(entry("BTCUSDT", 0.0, t0()), delivered(&["1"])),
        Err(OpenRejected::InvalidPrice { .. })
    ));
}

#[test]
fn test_lowest_price_and_close_scenario() {
    let mut tracker = tracker();
    tracker.open(entry("SOLUSDT", 100.0, t0()), delivered(&["1"])).unwrap();

    let ticks = [100.0, 95.0, 96.0];
    let mut previous_lowest = f64::MAX;
    for (i, price) in ticks.iter().enumerate() {
        let now = t0() + Duration::minutes(i as i64 + 1);
        match tracker.observe("SOLUSDT", *price, now) {
            Some(Observation::Holding { lowest_price }) => {
                assert!(lowest_price <= previous_lowest);
                previous_lowest = lowest_price;
            }
            other => panic!("tick {} should hold, got {:?}", i + 1, other),
        }
    }
    assert_eq!(tracker.get("SOLUSDT").unwrap().lowest_price, 95.0);

    let exit_time = t0() + Duration::hours(2) + Duration::minutes(5) + Duration::seconds(7);
    let completion = match tracker.observe("SOLUSDT", 101.1, exit_time) {
        Some(Observation::TargetReached(c)) => c,
        other => panic!("fourth tick should close, got {:?}", other),
    };

    assert_eq!(completion.lowest_price, 95.0);
    assert!((completion.drop_percent - (-5.0)).abs() < 1e-9);
    assert_eq!(format!("{:.2}", completion.drop_percent), "-5.00");
    assert_eq!(completion.elapsed_hms(), (2, 5, 7));
    assert_eq!(completion.exit_price, 101.1);

    assert!(tracker.close("SOLUSDT").is_some());
    assert!(!tracker.is_open("SOLUSDT"));
}

#[test]
fn test_drop_is_zero_when_price_only_rises() {
    let mut tracker = tracker();
    tracker.open(entry("BNBUSDT", 200.0, t0()), delivered(&["1"])).unwrap();
    tracker.observe("BNBUSDT", 201.0, t0() + Duration::minutes(1));

    match tracker.observe("BNBUSDT", 203.0, t0() + Duration::minutes(2)) {
        Some(Observation::TargetReached(c)) => assert_eq!(c.drop_percent, 0.0),
        other => panic!("expected completion, got {:?}", other),
    }
}

#[test]
fn test_target_fixed_at_creation() {
    let mut tracker = tracker();
    tracker.open(entry("XRPUSDT", 0.5, t0()), delivered(&["1"])).unwrap();
    let target = tracker.get("XRPUSDT").unwrap().target_price;

    tracker.observe("XRPUSDT", 0.4, t0() + Duration::minutes(1));
    tracker.observe("XRPUSDT", 0.45, t0() + Duration::minutes(2));
    assert_eq!(tracker.get("XRPUSDT").unwrap().target_price, target);
}

#[test]
fn test_open_symbol_never_reopens() {
    let mut tracker = tracker();
    tracker.open(entry("ADAUSDT", 1.0, t0()), delivered(&["1"])).unwrap();

    let later = t0() + Duration::hours(5);
    assert_eq!(
        tracker.check_open("ADAUSDT", later),
        Err(OpenRejected::AlreadyOpen("ADAUSDT".to_string()))
    );
    assert!(tracker.open(entry("ADAUSDT", 2.0, later), delivered(&["1"])).is_err());
    assert_eq!(tracker.get("ADAUSDT").unwrap().entry_price, 1.0);
    assert_eq!(tracker.len(), 1);
}

#[test]
fn test_cooldown_applies_after_close() {
    let mut tracker = tracker();
    tracker.open(entry("DOTUSDT", 10.0, t0()), delivered(&["1"])).unwrap();
    tracker.close("DOTUSDT");

    assert_eq!(
        tracker.check_open("DOTUSDT", t0() + Duration::minutes(10)),
        Err(OpenRejected::CoolingDown("DOTUSDT".to_string()))
    );
    assert!(tracker.check_open("DOTUSDT", t0() + Duration::minutes(40)).is_ok());
}

#[test]
fn test_completion_retry_then_expire() {
    let mut tracker = tracker().with_max_completion_attempts(3);
    tracker.open(entry("LTCUSDT", 100.0, t0()), delivered(&["1"])).unwrap();

    let first = match tracker.observe("LTCUSDT", 102.0, t0() + Duration::minutes(1)) {
        Some(Observation::TargetReached(c)) => c,
        other => panic!("expected completion, got {:?}", other),
    };

    assert!(matches!(
        tracker.completion_failed("LTCUSDT"),
        Some(CompletionRetry::Retry { attempts: 1 })
    ));

    // A later, lower price does not change the recorded outcome
    match tracker.observe("LTCUSDT", 90.0, t0() + Duration::minutes(2)) {
        Some(Observation::TargetReached(c)) => assert_eq!(c, first),
        other => panic!("expected pending completion, got {:?}", other),
    }
    assert_eq!(tracker.pending_completion("LTCUSDT"), Some(&first));

    assert!(matches!(
        tracker.completion_failed("LTCUSDT"),
        Some(CompletionRetry::Retry { attempts: 2 })
    ));
    match tracker.completion_failed("LTCUSDT") {
        Some(CompletionRetry::Expired(position)) => assert_eq!(position.completion_attempts, 3),
        other => panic!("expected expiry, got {:?}", other),
    }
    assert!(!tracker.is_open("LTCUSDT"));
}

#[test]
fn test_acknowledge_completion_per_chat() {
    let mut tracker = tracker();
    tracker.open(entry("ETHUSDT", 100.0, t0()), delivered(&["a", "b"])).unwrap();

    assert_eq!(tracker.acknowledge_completion("ETHUSDT", "a"), 1);
    assert_eq!(tracker.get("ETHUSDT").unwrap().notifications[0].chat_id, "b");
    assert_eq!(tracker.acknowledge_completion("ETHUSDT", "b"), 0);
    assert_eq!(tracker.acknowledge_completion("MISSING", "b"), 0);
}

#[test]
fn test_observe_unknown_symbol() {
    let mut tracker = tracker();
    assert!(tracker.observe("NOPE", 1.0, t0()).is_none());
}
