//! Walk-forward block planning and per-block label evaluation.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use super::dataset::Dataset;
use super::error::SigtraderError;

/// One walk-forward block. Test intervals are half-open `[test_from,
/// test_to)`, contiguous across blocks (up to the configured gap), and the
/// training interval always ends strictly before the test interval starts.
/// `train_from <= train_to` holds for every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Block {
    pub train_from: NaiveDate,
    pub train_to: NaiveDate,
    pub test_from: NaiveDate,
    pub test_to: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WfoConfig {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub block_days: u32,
    pub gap_days: u32,
}

/// Statistics of the label column within one test window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockMetrics {
    pub n: usize,
    pub nan_ratio: f64,
    pub trigger_rate: f64,
    #[serde(rename = "mean_R")]
    pub mean_label: f64,
    pub hit_rate: f64,
    pub dd_min: f64,
}

/// Partitions `[from, to)` into test blocks by advancing a cursor:
/// `test_from = cursor`, `test_to = cursor + block_days`, next cursor
/// `test_to + gap_days`. Training spans from the start of the range to the
/// day before the test window; the first block has no history, so its
/// training window degenerates to the single day before the range.
pub fn plan_blocks(config: &WfoConfig) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut cursor = config.from;

    while cursor < config.to {
        let test_from = cursor;
        let test_to = test_from + Duration::days(config.block_days as i64);
        let train_to = test_from - Duration::days(1);
        blocks.push(Block {
            train_from: config.from.min(train_to),
            train_to,
            test_from,
            test_to,
        });
        cursor = test_to + Duration::days(config.gap_days as i64);
    }

    blocks
}

/// Evaluates the label column over one block's test window.
///
/// Returns `Ok(None)` when the window holds no rows (the block is skipped,
/// not an error). A missing label column is an error; callers evaluating a
/// whole run should check the column once up front instead.
pub fn evaluate_block(
    dataset: &Dataset,
    label: &str,
    block: &Block,
) -> Result<Option<BlockMetrics>, SigtraderError> {
    let values = dataset.column_in_window(label, block.test_from, block.test_to)?;
    let n = values.len();
    if n == 0 {
        return Ok(None);
    }

    let mut nan_count = 0usize;
    let mut positive_valid = 0usize;
    let mut valid_count = 0usize;
    let mut valid_sum = 0.0_f64;

    let mut cum = 0.0_f64;
    let mut peak = 0.0_f64;
    let mut dd_min = 0.0_f64;

    for &(_, v) in &values {
        if v.is_nan() {
            nan_count += 1;
        } else {
            valid_count += 1;
            valid_sum += v;
            if v > 0.0 {
                positive_valid += 1;
            }
            cum += v;
        }
        if cum > peak {
            peak = cum;
        }
        let dd = cum - peak;
        if dd < dd_min {
            dd_min = dd;
        }
    }

    let (mean_label, hit_rate) = if valid_count > 0 {
        (
            valid_sum / valid_count as f64,
            positive_valid as f64 / valid_count as f64,
        )
    } else {
        (0.0, 0.0)
    };

    Ok(Some(BlockMetrics {
        n,
        nan_ratio: nan_count as f64 / n as f64,
        trigger_rate: positive_valid as f64 / n as f64,
        mean_label,
        hit_rate,
        dd_min,
    }))
}

/// Evaluates every planned block, skipping empty ones.
///
/// Fails fast when the label column is absent (before touching any block)
/// and when no block produces metrics at all: an empty global window is
/// fatal even though empty individual blocks are not.
pub fn evaluate_blocks(
    dataset: &Dataset,
    label: &str,
    blocks: &[Block],
) -> Result<Vec<(Block, BlockMetrics)>, SigtraderError> {
    if !dataset.has_column(label) {
        return Err(SigtraderError::MissingColumn {
            column: label.to_string(),
        });
    }

    let mut results = Vec::new();
    for block in blocks {
        if let Some(metrics) = evaluate_block(dataset, label, block)? {
            results.push((*block, metrics));
        }
    }

    if results.is_empty() {
        let from = blocks.first().map(|b| b.test_from).unwrap_or_default();
        let to = blocks.last().map(|b| b.test_to).unwrap_or_default();
        return Err(SigtraderError::EmptyWindow { from, to });
    }

    Ok(results)
}
