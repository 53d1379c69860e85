//! Report output port trait.

use crate::domain::error::SigtraderError;
use crate::domain::simulator::SimReport;
use crate::domain::walkforward::{Block, BlockMetrics, WfoConfig};

pub trait ReportPort {
    fn write_trade_report(&self, report: &SimReport) -> Result<(), SigtraderError>;
    fn write_metrics(&self, report: &SimReport) -> Result<(), SigtraderError>;
    fn write_wfo_summary(
        &self,
        run_tag: &str,
        label: &str,
        params: &WfoConfig,
        blocks: &[(Block, BlockMetrics)],
    ) -> Result<(), SigtraderError>;
}
