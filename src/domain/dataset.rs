//! Date-indexed table of named numeric columns.
//!
//! The pipeline is agnostic to the source format; adapters parse CSV (or
//! anything else) into this structure before the domain ever sees it.

use chrono::NaiveDate;

use super::error::SigtraderError;

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub date: NaiveDate,
    pub values: Vec<f64>,
}

/// Ordered, date-indexed rows of named numeric fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(columns: Vec<String>) -> Self {
        Dataset {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row, keeping rows in ascending date order is the caller's
    /// responsibility (adapters sort before handing the dataset over).
    pub fn push_row(&mut self, date: NaiveDate, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.push(Row { date, values });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Full column as a vector, failing fast when the column is absent.
    pub fn column(&self, name: &str) -> Result<Vec<f64>, SigtraderError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| SigtraderError::MissingColumn {
                column: name.to_string(),
            })?;
        Ok(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// Rows with `from <= date < to`, preserving order.
    pub fn select(&self, from: NaiveDate, to: NaiveDate) -> Vec<&Row> {
        self.rows
            .iter()
            .filter(|r| r.date >= from && r.date < to)
            .collect()
    }

    /// (date, value) pairs of one column restricted to `from <= date < to`.
    pub fn column_in_window(
        &self,
        name: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, SigtraderError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| SigtraderError::MissingColumn {
                column: name.to_string(),
            })?;
        Ok(self
            .rows
            .iter()
            .filter(|r| r.date >= from && r.date < to)
            .map(|r| (r.date, r.values[idx]))
            .collect())
    }

    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.rows.first(), self.rows.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date)),
            _ => None,
        }
    }
}
