//! CSV file data adapter.
//!
//! Loads a dataset from a single CSV file: a `date` column in the header
//! plus any number of named numeric columns. Blank and non-numeric cells
//! become NaN; the domain decides what NaN means.

use crate::domain::dataset::Dataset;
use crate::domain::error::SigtraderError;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

pub struct CsvDataAdapter {
    path: PathBuf,
}

impl CsvDataAdapter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Reads the whole file: header first, then one row per record, rows
    /// sorted ascending by date before the dataset is handed over.
    pub fn load(&self) -> Result<Dataset, SigtraderError> {
        let mut rdr =
            csv::Reader::from_path(&self.path).map_err(|e| SigtraderError::Data {
                reason: format!("failed to read {}: {}", self.path.display(), e),
            })?;

        let headers = rdr
            .headers()
            .map_err(|e| SigtraderError::Data {
                reason: format!("CSV header error: {}", e),
            })?
            .clone();

        let date_idx = headers
            .iter()
            .position(|h| h == "date")
            .ok_or_else(|| SigtraderError::MissingColumn {
                column: "date".to_string(),
            })?;

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != date_idx)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut dataset = Dataset::new(columns);
        for result in rdr.records() {
            let record = result.map_err(|e| SigtraderError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(date_idx).ok_or_else(|| SigtraderError::Data {
                reason: "row missing date cell".into(),
            })?;
            let date =
                NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                    SigtraderError::Data {
                        reason: format!("invalid date '{}': {}", date_str, e),
                    }
                })?;

            let values: Vec<f64> = record
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != date_idx)
                .map(|(_, cell)| cell.trim().parse::<f64>().unwrap_or(f64::NAN))
                .collect();

            if values.len() != dataset.columns.len() {
                return Err(SigtraderError::Data {
                    reason: format!(
                        "row for {} has {} values, expected {}",
                        date,
                        values.len(),
                        dataset.columns.len()
                    ),
                });
            }

            dataset.push_row(date, values);
        }

        dataset.rows.sort_by_key(|r| r.date);
        Ok(dataset)
    }
}

impl DataPort for CsvDataAdapter {
    fn fetch_dataset(&self, from: NaiveDate, to: NaiveDate) -> Result<Dataset, SigtraderError> {
        let mut dataset = self.load()?;
        dataset.rows.retain(|r| r.date >= from && r.date < to);
        Ok(dataset)
    }
}
