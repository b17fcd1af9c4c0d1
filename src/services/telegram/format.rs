//! MarkdownV2 rendering of alert messages

use crate::models::position::{Completion, OpenPosition};
use crate::models::rules::RsiSnapshot;
use crate::positions::tracker::Entry;
use chrono::{DateTime, Utc};

/// Characters Telegram's MarkdownV2 mode reserves
pub const MARKDOWN_V2_RESERVED: [char; 18] = [
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Prefix every reserved character with a backslash
pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 4);
    for c in text.chars() {
        if MARKDOWN_V2_RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Reference asset captured alongside an alert, e.g. BTCUSDT
#[derive(Debug, Clone, Copy)]
pub struct ReferenceContext<'a> {
    pub symbol: &'a str,
    pub at_entry: Option<f64>,
    pub at_exit: Option<f64>,
}

/// Precision scaled to the price magnitude so low-priced pairs stay readable
pub fn format_price(price: f64) -> String {
    let abs = price.abs();
    if abs >= 1000.0 {
        format!("{:.2}", price)
    } else if abs >= 1.0 {
        format!("{:.4}", price)
    } else {
        format!("{:.8}", price)
    }
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn format_duration_hms(hours: i64, minutes: i64, seconds: i64) -> String {
    format!("{}h {}m {}s", hours, minutes, seconds)
}

fn format_rsi(rsi: &RsiSnapshot) -> String {
    rsi.iter()
        .map(|(tf, value)| match value {
            Some(v) => format!("{} {:.2}", tf, v),
            None => format!("{} n/a", tf),
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

fn title(emoji: &str, text: &str) -> String {
    format!("{} *{}*", emoji, escape_markdown_v2(text))
}

fn line(text: String) -> String {
    escape_markdown_v2(&text)
}

/// Opening alert for a fresh buy signal
pub fn render_signal(
    entry: &Entry,
    target_price: f64,
    price_change_percent: Option<f64>,
    reference: Option<ReferenceContext<'_>>,
) -> String {
    let gain_pct = (target_price / entry.price - 1.0) * 100.0;
    let mut lines = vec![
        title("🚨", &format!("Buy signal: {}", entry.symbol)),
        line(format!("Entry: {}", format_price(entry.price))),
        line(format!("Target: {} (+{:.2}%)", format_price(target_price), gain_pct)),
        line(format!("RSI: {}", format_rsi(&entry.rsi))),
    ];
    if let Some(change) = price_change_percent {
        lines.push(line(format!("24h change: {:.2}%", change)));
    }
    if let Some(reference) = reference {
        if let Some(price) = reference.at_entry {
            lines.push(line(format!("{}: {}", reference.symbol, format_price(price))));
        }
    }
    lines.push(line(format!("Time: {}", format_timestamp(entry.time))));
    lines.join("\n")
}

/// Completion text that replaces the opening alert
pub fn render_completion(
    position: &OpenPosition,
    completion: &Completion,
    reference: Option<ReferenceContext<'_>>,
) -> String {
    let (h, m, s) = completion.elapsed_hms();
    let mut lines = vec![
        title("✅", &format!("Target reached: {}", completion.symbol)),
        line(format!("Entry: {}", format_price(completion.entry_price))),
        line(format!("Target: {}", format_price(completion.target_price))),
        line(format!("Exit: {}", format_price(completion.exit_price))),
        line(format!(
            "Lowest: {} ({:.2}%)",
            format_price(completion.lowest_price),
            completion.drop_percent
        )),
        line(format!("Duration: {}", format_duration_hms(h, m, s))),
        line(format!("RSI at entry: {}", format_rsi(&position.rsi_at_entry))),
    ];
    if let Some(reference) = reference {
        let render = |p: Option<f64>| p.map(format_price).unwrap_or_else(|| "n/a".to_string());
        lines.push(line(format!(
            "{}: {} -> {}",
            reference.symbol,
            render(reference.at_entry),
            render(reference.at_exit)
        )));
    }
    lines.push(line(format!("Opened: {}", format_timestamp(completion.entry_time))));
    lines.push(line(format!("Closed: {}", format_timestamp(completion.exit_time))));
    lines.join("\n")
}
