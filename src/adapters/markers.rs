//! Key-value summary markers embedded in Markdown reports.
//!
//! Summary files carry machine-readable HTML comments such as
//! `<!-- SIGNALS: trigger_rate=0.1; entries=12 -->` and
//! `<!-- PERF_PROXY: max_dd=0.05 -->`. This module parses and renders them;
//! the simulation engine itself never sees this format.

use crate::domain::metrics::{SignalStats, StabilityInputs};
use std::collections::BTreeMap;

const SECTIONS: [&str; 2] = ["SIGNALS", "PERF_PROXY"];

/// Parses every recognized marker line in `text`, merging all key-value
/// pairs into one map. Later lines override earlier ones on key collision.
pub fn parse_markers(text: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for line in text.lines() {
        if let Some((_, pairs)) = parse_marker_line(line) {
            out.extend(pairs);
        }
    }
    out
}

/// Parses one `<!-- SECTION: k=v; k=v -->` line, returning the section name
/// and its pairs. Lines that are not markers return `None`.
pub fn parse_marker_line(line: &str) -> Option<(&'static str, BTreeMap<String, String>)> {
    let trimmed = line.trim();
    let body = trimmed.strip_prefix("<!--")?.strip_suffix("-->")?.trim();

    for section in SECTIONS {
        if let Some(rest) = body.strip_prefix(section) {
            let kvs = rest.strip_prefix(':')?;
            let mut pairs = BTreeMap::new();
            for pair in kvs.split(';') {
                if let Some((k, v)) = pair.split_once('=') {
                    pairs.insert(k.trim().to_string(), v.trim().to_string());
                }
            }
            return Some((section, pairs));
        }
    }
    None
}

/// Renders the SIGNALS marker line for a summary file.
pub fn format_signals_marker(stats: &SignalStats) -> String {
    let churn = stats
        .churn_rate
        .map(|c| format!("{:.4}", c))
        .unwrap_or_else(|| "N/A".to_string());
    format!(
        "<!-- SIGNALS: entries={}; exits={}; exits_lt_cooldown={}; trigger_rate={:.4}; long_rate={:.4}; short_rate={:.4}; churn_rate={} -->",
        stats.entries,
        stats.exits,
        stats.exits_within_cooldown,
        stats.trigger_rate,
        stats.long_rate,
        stats.short_rate,
        churn,
    )
}

/// Renders the PERF_PROXY marker line.
pub fn format_perf_marker(max_dd: f64) -> String {
    format!("<!-- PERF_PROXY: max_dd={:.4} -->", max_dd)
}

/// Builds stability-score inputs from parsed markers. Absent or
/// non-numeric values count as 0, matching the scoring convention that an
/// unknown quantity earns no penalty.
pub fn stability_inputs_from(markers: &BTreeMap<String, String>) -> StabilityInputs {
    let get = |key: &str| {
        markers
            .get(key)
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    StabilityInputs {
        trigger_rate: get("trigger_rate"),
        long_rate: get("long_rate"),
        short_rate: get("short_rate"),
        churn_rate: get("churn_rate"),
        max_dd: get("max_dd"),
    }
}
