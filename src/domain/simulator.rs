//! Bar-by-bar paper-trade simulator.
//!
//! A signal computed on bar `i` fills at the close of bar `i+1`, so no fill
//! ever uses information from its own bar. The simulator favors conservative
//! inaction: a buy without sufficient cash or a sell without a position is
//! skipped silently, never an error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::mapper::SignalSet;
use super::ohlcv::OhlcvBar;

/// Simulator parameters: flat fee per fill, percentage slippage.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub initial_cash: f64,
    pub fee: f64,
    pub slippage_pct: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            initial_cash: 1000.0,
            fee: 0.1,
            slippage_pct: 0.001,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

/// Per-bar instruction fed to the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

/// One fill. `ts` is the signal bar's date; `cash` is cash after the fill.
/// Immutable once appended to the trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub ts: NaiveDate,
    pub side: Side,
    pub price: f64,
    pub fee: f64,
    pub cash: f64,
}

/// Simulation outcome: final mark-to-market valuation, trade log, and a
/// per-bar equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimReport {
    pub initial_cash: f64,
    pub final_net: f64,
    pub cash: f64,
    pub position: f64,
    pub trades: Vec<Trade>,
    pub equity: Vec<f64>,
}

/// The built-in deterministic signal: buy when a bar closes above its open,
/// sell when it closes below.
pub fn close_over_open_signals(bars: &[OhlcvBar]) -> Vec<Signal> {
    bars.iter()
        .map(|bar| {
            if bar.close > bar.open {
                Signal::Buy
            } else if bar.close < bar.open {
                Signal::Sell
            } else {
                Signal::Hold
            }
        })
        .collect()
}

/// Collapses mapped entry/exit sequences to the simulator's long-only
/// instruction stream: long entries buy; long exits and short entries sell.
pub fn signals_from_set(set: &SignalSet) -> Vec<Signal> {
    (0..set.len())
        .map(|i| {
            if set.enter_long[i] == 1 {
                Signal::Buy
            } else if set.exit_long[i] == 1 || set.enter_short[i] == 1 {
                Signal::Sell
            } else {
                Signal::Hold
            }
        })
        .collect()
}

/// Runs the simulation over aligned bars and signals.
///
/// The final bar is never evaluated for fills (there is no subsequent close
/// to fill against). Fewer than two bars yields zero trades and
/// `final_net == initial_cash`.
pub fn run(bars: &[OhlcvBar], config: &SimConfig, signals: &[Signal]) -> SimReport {
    let mut cash = config.initial_cash;
    let mut position = 0.0_f64;
    let mut trades: Vec<Trade> = Vec::new();
    let mut equity: Vec<f64> = Vec::with_capacity(bars.len());

    if let Some(first) = bars.first() {
        equity.push(cash + position * first.close);
    }

    for i in 0..bars.len().saturating_sub(1) {
        let next_close = bars[i + 1].close;
        let signal = signals.get(i).copied().unwrap_or(Signal::Hold);

        match signal {
            Signal::Buy if position == 0.0 => {
                let fill_price = next_close * (1.0 + config.slippage_pct);
                let cost = fill_price + config.fee;
                if cash >= cost {
                    cash -= cost;
                    position = 1.0;
                    trades.push(Trade {
                        ts: bars[i].date,
                        side: Side::Buy,
                        price: fill_price,
                        fee: config.fee,
                        cash,
                    });
                }
            }
            Signal::Sell if position > 0.0 => {
                let fill_price = next_close * (1.0 - config.slippage_pct);
                cash += fill_price - config.fee;
                position = 0.0;
                trades.push(Trade {
                    ts: bars[i].date,
                    side: Side::Sell,
                    price: fill_price,
                    fee: config.fee,
                    cash,
                });
            }
            _ => {}
        }

        equity.push(cash + position * next_close);
    }

    let final_net = match bars.last() {
        Some(last) => cash + position * last.close,
        None => cash,
    };

    SimReport {
        initial_cash: config.initial_cash,
        final_net,
        cash,
        position,
        trades,
        equity,
    }
}
