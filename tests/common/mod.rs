#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use sigtrader::domain::dataset::Dataset;
use sigtrader::domain::error::SigtraderError;
pub use sigtrader::domain::ohlcv::OhlcvBar;
use sigtrader::ports::data_port::DataPort;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily dataset starting 2025-01-01 with one named column.
pub fn column_dataset(name: &str, values: &[f64]) -> Dataset {
    let mut ds = Dataset::new(vec![name.to_string()]);
    for (i, &v) in values.iter().enumerate() {
        ds.push_row(date(2025, 1, 1) + Duration::days(i as i64), vec![v]);
    }
    ds
}

/// Daily OHLCV dataset built from a close series; each bar opens at the
/// previous close.
pub fn ohlcv_dataset(closes: &[f64]) -> Dataset {
    let mut ds = Dataset::new(
        ["open", "high", "low", "close", "volume"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    let mut prev = closes.first().copied().unwrap_or(100.0);
    for (i, &close) in closes.iter().enumerate() {
        let open = prev;
        ds.push_row(
            date(2025, 1, 1) + Duration::days(i as i64),
            vec![open, open.max(close), open.min(close), close, 1000.0],
        );
        prev = close;
    }
    ds
}

pub fn make_bar(d: NaiveDate, open: f64, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: d,
        open,
        high: open.max(close),
        low: open.min(close),
        close,
        volume: 1000.0,
    }
}

/// In-memory data port serving one fixed dataset.
pub struct MockDataPort {
    pub dataset: Dataset,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            error: None,
        }
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_dataset(&self, from: NaiveDate, to: NaiveDate) -> Result<Dataset, SigtraderError> {
        if let Some(reason) = &self.error {
            return Err(SigtraderError::Data {
                reason: reason.clone(),
            });
        }
        let mut ds = self.dataset.clone();
        ds.rows.retain(|r| r.date >= from && r.date < to);
        Ok(ds)
    }
}
