//! Metrics over signal sequences, equity curves, and trade logs.

use serde::Serialize;

use super::mapper::SignalSet;
use super::simulator::{Side, Trade};

/// Behavioral statistics of a mapped signal run.
///
/// `trigger_rate` is entries per bar. `long_rate` and `short_rate` split
/// the entries by direction, so they sum to 1 whenever anything entered
/// (both 0 otherwise). `churn_rate` is the share of entries closed out
/// within the cooldown window; it is `None` (not zero) when there are no
/// entries at all, so downstream reports can tell "no churn" from
/// "nothing happened".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalStats {
    pub entries: usize,
    pub exits: usize,
    pub exits_within_cooldown: usize,
    pub trigger_rate: f64,
    pub long_rate: f64,
    pub short_rate: f64,
    pub avg_hold_bars: Option<f64>,
    pub churn_rate: Option<f64>,
}

/// Scans the four sequences in lockstep. Each exit closes the most recent
/// unconsumed entry; it counts as churn when it lands fewer than
/// `cooldown_bars` steps after that entry. An exit with no open entry
/// contributes to neither churn nor hold time.
pub fn signal_stats(set: &SignalSet, cooldown_bars: u32) -> SignalStats {
    let n = set.len();
    let mut entries = 0usize;
    let mut long_entries = 0usize;
    let mut short_entries = 0usize;
    let mut exits = 0usize;
    let mut exits_within_cooldown = 0usize;
    let mut last_entry: Option<usize> = None;
    let mut hold_sum = 0usize;
    let mut hold_count = 0usize;

    for i in 0..n {
        if set.enter_long[i] == 1 || set.enter_short[i] == 1 {
            entries += 1;
            if set.enter_long[i] == 1 {
                long_entries += 1;
            } else {
                short_entries += 1;
            }
            last_entry = Some(i);
        }
        if set.exit_long[i] == 1 || set.exit_short[i] == 1 {
            exits += 1;
            if let Some(entry) = last_entry.take() {
                if i - entry < cooldown_bars as usize {
                    exits_within_cooldown += 1;
                }
                hold_sum += i - entry;
                hold_count += 1;
            }
        }
    }

    let entry_share = |count: usize| {
        if entries > 0 {
            count as f64 / entries as f64
        } else {
            0.0
        }
    };

    SignalStats {
        entries,
        exits,
        exits_within_cooldown,
        trigger_rate: if n > 0 { entries as f64 / n as f64 } else { 0.0 },
        long_rate: entry_share(long_entries),
        short_rate: entry_share(short_entries),
        avg_hold_bars: (hold_count > 0).then(|| hold_sum as f64 / hold_count as f64),
        churn_rate: (entries > 0).then(|| exits_within_cooldown as f64 / entries as f64),
    }
}

/// Maximum fractional drawdown from a running peak, `None` for an empty
/// curve. A non-positive peak contributes zero rather than dividing by it.
pub fn max_drawdown(equity: &[f64]) -> Option<f64> {
    let first = *equity.first()?;
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &v in equity {
        if v > peak {
            peak = v;
        }
        let dd = if peak != 0.0 { (peak - v) / peak } else { 0.0 };
        if dd > max_dd {
            max_dd = dd;
        }
    }
    Some(max_dd)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawdownSummary {
    pub dd_min: f64,
    pub dd_median: f64,
    pub dd_max: f64,
}

/// Min/median/max of the per-point drawdown series.
pub fn drawdown_summary(equity: &[f64]) -> Option<DrawdownSummary> {
    if equity.is_empty() {
        return None;
    }
    let mut peak = equity[0];
    let mut dds: Vec<f64> = Vec::with_capacity(equity.len());
    for &v in equity {
        if v > peak {
            peak = v;
        }
        dds.push(if peak != 0.0 { (peak - v) / peak } else { 0.0 });
    }
    dds.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some(DrawdownSummary {
        dd_min: dds[0],
        dd_median: median_of_sorted(&dds),
        dd_max: dds[dds.len() - 1],
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradePnlStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_pop: f64,
    pub min: f64,
    pub max: f64,
}

/// Pairs each sell with the preceding buy: P&L is sell proceeds minus buy
/// cost, fees on both legs included. An unmatched trailing buy (still open
/// at the end of the log) produces no P&L.
pub fn trade_pnls(trades: &[Trade]) -> Vec<f64> {
    let mut pnls = Vec::new();
    let mut open_buy: Option<&Trade> = None;
    for trade in trades {
        match trade.side {
            Side::Buy => open_buy = Some(trade),
            Side::Sell => {
                if let Some(buy) = open_buy.take() {
                    pnls.push((trade.price - trade.fee) - (buy.price + buy.fee));
                }
            }
        }
    }
    pnls
}

/// Summary statistics over per-trade P&L, `None` when no round trip closed.
/// Standard deviation is the population form.
pub fn trade_pnl_stats(pnls: &[f64]) -> Option<TradePnlStats> {
    if pnls.is_empty() {
        return None;
    }
    let count = pnls.len();
    let mean = pnls.iter().sum::<f64>() / count as f64;
    let variance = pnls.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / count as f64;

    let mut sorted = pnls.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    Some(TradePnlStats {
        count,
        mean,
        median: median_of_sorted(&sorted),
        std_pop: variance.sqrt(),
        min: sorted[0],
        max: sorted[count - 1],
    })
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Inputs to the stability score. A run with no entries has no churn rate;
/// pass `churn_rate` as 0 in that case (no churn penalty).
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityInputs {
    pub trigger_rate: f64,
    pub long_rate: f64,
    pub short_rate: f64,
    pub churn_rate: f64,
    pub max_dd: f64,
}

const TARGET_BAND_CENTER: f64 = 0.1;
const TARGET_BAND_HALFWIDTH: f64 = 0.05;
const IMBALANCE_TOL: f64 = 0.1;
const CHURN_REF: f64 = 0.3;
const DD_REF: f64 = 0.15;

/// Composite 0..=100 score: start at 100, subtract four penalties of up to
/// 25 points each (trigger rate distance from the target band, long/short
/// imbalance beyond tolerance, churn against its reference, drawdown against
/// its reference).
pub fn stability_score(inputs: &StabilityInputs) -> u32 {
    let penalty = |x: f64| x.clamp(0.0, 1.0) * 25.0;

    let trigger =
        penalty((inputs.trigger_rate - TARGET_BAND_CENTER).abs() / TARGET_BAND_HALFWIDTH);
    let imbalance = penalty(
        ((inputs.long_rate - inputs.short_rate).abs() - IMBALANCE_TOL).max(0.0)
            / (1.0 - IMBALANCE_TOL),
    );
    let churn = penalty(inputs.churn_rate / CHURN_REF);
    let dd = penalty(inputs.max_dd / DD_REF);

    (100.0 - (trigger + imbalance + churn + dd)).max(0.0).round() as u32
}
