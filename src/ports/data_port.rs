//! Dataset access port trait.

use chrono::NaiveDate;

use crate::domain::dataset::Dataset;
use crate::domain::error::SigtraderError;

pub trait DataPort {
    /// Rows with dates in `[from, to)`, sorted ascending by date.
    fn fetch_dataset(&self, from: NaiveDate, to: NaiveDate) -> Result<Dataset, SigtraderError>;
}
