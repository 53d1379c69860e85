//! OHLCV bar representation and the synthetic-price fallback.

use chrono::NaiveDate;

use super::dataset::Dataset;
use super::error::SigtraderError;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// How a label column encodes price movement when OHLCV is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    /// Per-row percentage return: `price = 100 * cumprod(1 + label)`.
    Pct,
    /// Per-row additive move: `price = 100 + cumsum(label)`.
    Additive,
}

impl LabelKind {
    /// Percentage labels are named with a `_pct` suffix by convention.
    pub fn infer(column: &str) -> Self {
        if column.ends_with("_pct") {
            LabelKind::Pct
        } else {
            LabelKind::Additive
        }
    }
}

const REQUIRED_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Extracts OHLCV bars from a dataset carrying the five standard columns.
pub fn bars_from_dataset(ds: &Dataset) -> Result<Vec<OhlcvBar>, SigtraderError> {
    for col in REQUIRED_COLUMNS {
        if !ds.has_column(col) {
            return Err(SigtraderError::MissingColumn {
                column: col.to_string(),
            });
        }
    }
    let open = ds.column("open")?;
    let high = ds.column("high")?;
    let low = ds.column("low")?;
    let close = ds.column("close")?;
    let volume = ds.column("volume")?;

    Ok(ds
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| OhlcvBar {
            date: row.date,
            open: open[i],
            high: high[i],
            low: low[i],
            close: close[i],
            volume: volume[i],
        })
        .collect())
}

/// Derives a synthetic OHLCV series from a label column.
///
/// Documented fallback for datasets without price columns, not an error
/// path. NaN labels count as zero movement. Each bar opens at the previous
/// close (the first opens at its own close); high/low span open and close;
/// volume is a placeholder 1.
pub fn synthesize_bars(labels: &[(NaiveDate, f64)], kind: LabelKind) -> Vec<OhlcvBar> {
    let mut bars = Vec::with_capacity(labels.len());
    let mut level = 100.0_f64;
    let mut prev_close: Option<f64> = None;

    for &(date, label) in labels {
        let step = if label.is_nan() { 0.0 } else { label };
        level = match kind {
            LabelKind::Pct => level * (1.0 + step),
            LabelKind::Additive => level + step,
        };
        let close = level;
        let open = prev_close.unwrap_or(close);
        bars.push(OhlcvBar {
            date,
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: 1.0,
        });
        prev_close = Some(close);
    }

    bars
}
