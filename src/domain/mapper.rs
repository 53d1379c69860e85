//! Threshold signal mapper: prediction series → entry/exit signal sequences.
//!
//! A single pass over the predictions drives a three-state machine
//! (flat/long/short) with a hysteresis band on exits and a cooldown counter
//! suppressing re-entries after an exit. Deterministic and total: any
//! numeric input (NaN included) produces four 0/1 sequences of the input
//! length.

/// Which exit-boundary convention to apply.
///
/// Two reference conventions exist for how far the exit threshold sits from
/// the entry threshold; both are kept as named variants so callers can pin
/// the one their test vectors assume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitBand {
    /// Exit band is the full hysteresis offset.
    #[default]
    Full,
    /// Exit band is half the hysteresis offset.
    Half,
}

impl ExitBand {
    pub fn width(&self, hysteresis: f64) -> f64 {
        match self {
            ExitBand::Full => hysteresis,
            ExitBand::Half => hysteresis / 2.0,
        }
    }
}

/// Mapper parameters. `dn < up` is expected but not enforced; overlapping
/// thresholds still run the same state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdConfig {
    pub up: f64,
    pub dn: f64,
    pub hysteresis: f64,
    pub cooldown_bars: u32,
    pub exit_band: ExitBand,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        ThresholdConfig {
            up: 0.1,
            dn: -0.1,
            hysteresis: 0.02,
            cooldown_bars: 3,
            exit_band: ExitBand::Full,
        }
    }
}

/// Four parallel 0/1 sequences, one value per prediction step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalSet {
    pub enter_long: Vec<u8>,
    pub enter_short: Vec<u8>,
    pub exit_long: Vec<u8>,
    pub exit_short: Vec<u8>,
}

impl SignalSet {
    fn with_capacity(n: usize) -> Self {
        SignalSet {
            enter_long: Vec::with_capacity(n),
            enter_short: Vec::with_capacity(n),
            exit_long: Vec::with_capacity(n),
            exit_short: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.enter_long.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enter_long.is_empty()
    }
}

/// Position held by the mapper during a pass. Local to one call; nothing
/// survives between invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PositionState {
    Flat,
    Long,
    Short,
}

/// Maps a prediction series to entry/exit signals.
///
/// Per step, exits are evaluated before entries:
/// - long exits when `pred <= up - band`, short exits when
///   `pred >= dn + band`; an exit flattens the state and arms the cooldown;
/// - while flat with a live cooldown, no entry is evaluated and the counter
///   drops by one (the exit step itself counts), so entries resume exactly
///   `cooldown_bars` steps after the exit;
/// - otherwise `pred >= up` enters long and `pred <= dn` enters short.
///   Entries never touch the cooldown counter.
///
/// Exit and entry are never both emitted on the same step.
pub fn map_signals(preds: &[f64], config: &ThresholdConfig) -> SignalSet {
    let band = config.exit_band.width(config.hysteresis);
    let exit_long_threshold = config.up - band;
    let exit_short_threshold = config.dn + band;

    let mut out = SignalSet::with_capacity(preds.len());
    let mut state = PositionState::Flat;
    let mut cooldown: u32 = 0;

    for &pred in preds {
        let (mut el, mut es, mut xl, mut xs) = (0u8, 0u8, 0u8, 0u8);

        match state {
            PositionState::Long if pred <= exit_long_threshold => {
                xl = 1;
                state = PositionState::Flat;
                cooldown = config.cooldown_bars;
            }
            PositionState::Short if pred >= exit_short_threshold => {
                xs = 1;
                state = PositionState::Flat;
                cooldown = config.cooldown_bars;
            }
            _ => {}
        }

        if state == PositionState::Flat {
            if cooldown > 0 {
                cooldown -= 1;
            } else if pred >= config.up {
                el = 1;
                state = PositionState::Long;
            } else if pred <= config.dn {
                es = 1;
                state = PositionState::Short;
            }
        }

        out.enter_long.push(el);
        out.enter_short.push(es);
        out.exit_long.push(xl);
        out.exit_short.push(xs);
    }

    out
}
