//! JSON and Markdown report writers.
//!
//! Everything lands under one output directory: the trade report and its
//! trades CSV, the derived metrics file, and the walk-forward summary in
//! both JSON and Markdown forms.

use crate::domain::error::SigtraderError;
use crate::domain::metrics::{
    drawdown_summary, max_drawdown, trade_pnl_stats, trade_pnls, DrawdownSummary, TradePnlStats,
};
use crate::domain::simulator::SimReport;
use crate::domain::walkforward::{Block, BlockMetrics, WfoConfig};
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Compact metrics derived from a trade report. `None` fields serialize as
/// JSON `null`, meaning "not computable", never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub final_net: f64,
    pub trades_count: usize,
    pub trade_pnl: Option<TradePnlStats>,
    pub max_drawdown: Option<f64>,
    pub drawdown_summary: Option<DrawdownSummary>,
}

impl MetricsReport {
    pub fn from_sim_report(report: &SimReport) -> Self {
        let pnls = trade_pnls(&report.trades);
        MetricsReport {
            final_net: report.final_net,
            trades_count: report.trades.len(),
            trade_pnl: trade_pnl_stats(&pnls),
            max_drawdown: max_drawdown(&report.equity),
            drawdown_summary: drawdown_summary(&report.equity),
        }
    }
}

#[derive(Serialize)]
struct WfoSummary<'a> {
    run_tag: &'a str,
    label: &'a str,
    params: &'a WfoConfig,
    blocks: Vec<BlockRow<'a>>,
}

#[derive(Serialize)]
struct BlockRow<'a> {
    #[serde(flatten)]
    block: &'a Block,
    #[serde(flatten)]
    metrics: &'a BlockMetrics,
}

pub struct JsonReportAdapter {
    out_dir: PathBuf,
}

impl JsonReportAdapter {
    pub fn new<P: AsRef<Path>>(out_dir: P) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
        }
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), SigtraderError> {
        let json = serde_json::to_string_pretty(value).map_err(|e| SigtraderError::Report {
            reason: format!("failed to serialize {}: {}", name, e),
        })?;
        fs::write(self.out_dir.join(name), json)?;
        Ok(())
    }

    fn write_trades_csv(&self, report: &SimReport) -> Result<(), SigtraderError> {
        let path = self.out_dir.join("trades.csv");
        let mut wtr = csv::Writer::from_path(&path).map_err(|e| SigtraderError::Report {
            reason: format!("failed to write {}: {}", path.display(), e),
        })?;
        for trade in &report.trades {
            wtr.serialize(trade).map_err(|e| SigtraderError::Report {
                reason: format!("failed to write trade row: {}", e),
            })?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn render_wfo_markdown(
        run_tag: &str,
        label: &str,
        blocks: &[(Block, BlockMetrics)],
    ) -> String {
        let mut md = String::new();
        md.push_str(&format!("# Walk-forward summary: {}\n\n", run_tag));
        md.push_str(&format!("Label: `{}`\n\n", label));
        md.push_str(
            "| train_from | train_to | test_from | test_to | n | nan_ratio | trigger_rate | mean_R | hit_rate | dd_min |\n",
        );
        md.push_str("|---|---|---|---|---|---|---|---|---|---|\n");
        for (block, m) in blocks {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {:.4} | {:.4} | {:.6} | {:.4} | {:.6} |\n",
                block.train_from,
                block.train_to,
                block.test_from,
                block.test_to,
                m.n,
                m.nan_ratio,
                m.trigger_rate,
                m.mean_label,
                m.hit_rate,
                m.dd_min,
            ));
        }
        md
    }
}

impl ReportPort for JsonReportAdapter {
    fn write_trade_report(&self, report: &SimReport) -> Result<(), SigtraderError> {
        self.write_json("paper_trade_report.json", report)?;
        self.write_trades_csv(report)
    }

    fn write_metrics(&self, report: &SimReport) -> Result<(), SigtraderError> {
        self.write_json(
            "paper_trade_metrics.json",
            &MetricsReport::from_sim_report(report),
        )
    }

    fn write_wfo_summary(
        &self,
        run_tag: &str,
        label: &str,
        params: &WfoConfig,
        blocks: &[(Block, BlockMetrics)],
    ) -> Result<(), SigtraderError> {
        let summary = WfoSummary {
            run_tag,
            label,
            params,
            blocks: blocks
                .iter()
                .map(|(block, metrics)| BlockRow { block, metrics })
                .collect(),
        };
        self.write_json(&format!("wfo_{}.json", run_tag), &summary)?;

        let md = Self::render_wfo_markdown(run_tag, label, blocks);
        fs::write(self.out_dir.join(format!("wfo_{}.md", run_tag)), md)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::simulator::{Side, Trade};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn sample_report() -> SimReport {
        SimReport {
            initial_cash: 1000.0,
            final_net: 1009.0,
            cash: 1009.0,
            position: 0.0,
            trades: vec![
                Trade {
                    ts: date(1),
                    side: Side::Buy,
                    price: 100.0,
                    fee: 0.1,
                    cash: 899.9,
                },
                Trade {
                    ts: date(3),
                    side: Side::Sell,
                    price: 110.0,
                    fee: 0.1,
                    cash: 1009.8,
                },
            ],
            equity: vec![1000.0, 1000.0, 1005.0, 1009.8],
        }
    }

    #[test]
    fn trade_report_round_trips_through_json() {
        let dir = TempDir::new().unwrap();
        let adapter = JsonReportAdapter::new(dir.path());
        adapter.write_trade_report(&sample_report()).unwrap();

        let json = fs::read_to_string(dir.path().join("paper_trade_report.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["final_net"], 1009.0);
        assert_eq!(value["trades"].as_array().unwrap().len(), 2);
        assert_eq!(value["trades"][0]["side"], "buy");
        assert_eq!(value["trades"][0]["ts"], "2025-01-01");

        let csv_text = fs::read_to_string(dir.path().join("trades.csv")).unwrap();
        assert!(csv_text.starts_with("ts,side,price,fee,cash"));
        assert!(csv_text.contains("2025-01-03,sell,110.0,0.1,1009.8"));
    }

    #[test]
    fn metrics_carry_computed_statistics() {
        let dir = TempDir::new().unwrap();
        let adapter = JsonReportAdapter::new(dir.path());
        adapter.write_metrics(&sample_report()).unwrap();

        let json = fs::read_to_string(dir.path().join("paper_trade_metrics.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["trades_count"], 2);
        // one closed round trip: (110 - 0.1) - (100 + 0.1)
        assert_eq!(value["trade_pnl"]["count"], 1);
        assert!((value["trade_pnl"]["mean"].as_f64().unwrap() - 9.8).abs() < 1e-9);
        assert!(value["max_drawdown"].as_f64().unwrap() >= 0.0);
    }

    #[test]
    fn uncomputable_metrics_serialize_as_null() {
        let dir = TempDir::new().unwrap();
        let adapter = JsonReportAdapter::new(dir.path());
        let report = SimReport {
            initial_cash: 1000.0,
            final_net: 1000.0,
            cash: 1000.0,
            position: 0.0,
            trades: vec![],
            equity: vec![],
        };
        adapter.write_metrics(&report).unwrap();

        let json = fs::read_to_string(dir.path().join("paper_trade_metrics.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["trade_pnl"].is_null());
        assert!(value["max_drawdown"].is_null());
        assert!(value["drawdown_summary"].is_null());
    }

    #[test]
    fn wfo_summary_writes_json_and_markdown() {
        let dir = TempDir::new().unwrap();
        let adapter = JsonReportAdapter::new(dir.path());
        let params = WfoConfig {
            from: date(1),
            to: date(11),
            block_days: 5,
            gap_days: 0,
        };
        let block = Block {
            train_from: date(1),
            train_to: date(5),
            test_from: date(6),
            test_to: date(11),
        };
        let metrics = BlockMetrics {
            n: 5,
            nan_ratio: 0.0,
            trigger_rate: 0.4,
            mean_label: 0.01,
            hit_rate: 0.6,
            dd_min: -0.02,
        };
        adapter
            .write_wfo_summary("run7", "label_r3", &params, &[(block, metrics)])
            .unwrap();

        let json = fs::read_to_string(dir.path().join("wfo_run7.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["run_tag"], "run7");
        assert_eq!(value["label"], "label_r3");
        assert_eq!(value["params"]["block_days"], 5);
        let row = &value["blocks"][0];
        assert_eq!(row["test_from"], "2025-01-06");
        assert_eq!(row["n"], 5);
        assert_eq!(row["mean_R"], 0.01);

        let md = fs::read_to_string(dir.path().join("wfo_run7.md")).unwrap();
        assert!(md.contains("| train_from | train_to | test_from | test_to |"));
        assert!(md.contains("| 2025-01-06 |"));
    }
}
