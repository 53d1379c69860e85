//! End-to-end pipeline tests: dataset in, signals, simulated trades,
//! metrics, and reports out, with no real data source behind the ports.

mod common;

use approx::assert_relative_eq;
use common::*;
use sigtrader::adapters::csv_data::CsvDataAdapter;
use sigtrader::adapters::json_report::{JsonReportAdapter, MetricsReport};
use sigtrader::adapters::markers::{
    format_perf_marker, format_signals_marker, parse_markers, stability_inputs_from,
};
use sigtrader::cli::{build_threshold_config, MapOverrides};
use sigtrader::domain::mapper::{map_signals, ExitBand, ThresholdConfig};
use sigtrader::domain::metrics::{max_drawdown, signal_stats, stability_score};
use sigtrader::domain::ohlcv::{bars_from_dataset, synthesize_bars, LabelKind};
use sigtrader::domain::simulator::{self, signals_from_set, SimConfig};
use sigtrader::domain::walkforward::{evaluate_blocks, plan_blocks, WfoConfig};
use sigtrader::ports::data_port::DataPort;
use sigtrader::ports::report_port::ReportPort;

mod prediction_to_trades {
    use super::*;

    fn no_cooldown_config() -> ThresholdConfig {
        ThresholdConfig {
            up: 0.1,
            dn: -0.1,
            hysteresis: 0.02,
            cooldown_bars: 0,
            exit_band: ExitBand::Full,
        }
    }

    #[test]
    fn mapped_signals_drive_the_simulator() {
        let preds = [0.2, 0.2, 0.05, 0.2];
        let set = map_signals(&preds, &no_cooldown_config());
        assert_eq!(set.enter_long, vec![1, 0, 0, 1]);
        assert_eq!(set.exit_long, vec![0, 0, 1, 0]);

        let closes = [100.0, 110.0, 105.0, 120.0];
        let dataset = ohlcv_dataset(&closes);
        let bars = bars_from_dataset(&dataset).unwrap();

        let signals = signals_from_set(&set);
        let config = SimConfig {
            initial_cash: 1000.0,
            fee: 0.1,
            slippage_pct: 0.001,
        };
        let report = simulator::run(&bars, &config, &signals);

        // buy fills at the close after the entry signal, sell after the exit
        assert_eq!(report.trades.len(), 2);
        assert_relative_eq!(report.trades[0].price, 110.0 * 1.001, epsilon = 1e-12);
        assert_relative_eq!(report.trades[1].price, 120.0 * 0.999, epsilon = 1e-12);
        assert_eq!(report.position, 0.0);
        assert_relative_eq!(report.final_net, report.cash, epsilon = 1e-12);
        assert_eq!(report.equity.len(), bars.len());
    }

    #[test]
    fn synthesized_prices_feed_the_same_pipeline() {
        let labels = [0.02, 0.02, -0.05, 0.03, 0.01];
        let dataset = column_dataset("label_r3_pct", &labels);
        let pairs: Vec<_> = dataset
            .column("label_r3_pct")
            .unwrap()
            .into_iter()
            .zip(dataset.rows.iter().map(|r| r.date))
            .map(|(v, d)| (d, v))
            .collect();
        let bars = synthesize_bars(&pairs, LabelKind::infer("label_r3_pct"));
        assert_eq!(bars.len(), labels.len());
        assert_relative_eq!(bars[0].close, 102.0, epsilon = 1e-12);

        let report = simulator::run(
            &bars,
            &SimConfig::default(),
            &sigtrader::domain::simulator::close_over_open_signals(&bars),
        );
        // deterministic: run twice, identical output
        let again = simulator::run(
            &bars,
            &SimConfig::default(),
            &sigtrader::domain::simulator::close_over_open_signals(&bars),
        );
        assert_eq!(report, again);
    }

    #[test]
    fn signal_stats_and_stability_close_the_loop() {
        let preds = [0.2, -0.2, 0.2, 0.2, 0.2];
        let cfg = ThresholdConfig {
            cooldown_bars: 3,
            ..no_cooldown_config()
        };
        let set = map_signals(&preds, &cfg);
        let stats = signal_stats(&set, cfg.cooldown_bars);
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.exits_within_cooldown, 1);
        assert_relative_eq!(stats.churn_rate.unwrap(), 0.5);

        // markers carry the stats into the scoring stage
        let md = format!(
            "{}\n{}\n",
            format_signals_marker(&stats),
            format_perf_marker(0.02)
        );
        let inputs = stability_inputs_from(&parse_markers(&md));
        assert_relative_eq!(inputs.max_dd, 0.02);
        let score = stability_score(&inputs);
        assert!(score <= 100);
    }
}

mod walkforward_pipeline {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn plan_evaluate_and_report() {
        let labels: Vec<f64> = (0..20).map(|i| if i % 3 == 0 { -0.01 } else { 0.02 }).collect();
        let dataset = column_dataset("label_r3", &labels);

        let config = WfoConfig {
            from: date(2025, 1, 1),
            to: date(2025, 1, 21),
            block_days: 5,
            gap_days: 0,
        };
        let blocks = plan_blocks(&config);
        assert_eq!(blocks.len(), 4);

        let results = evaluate_blocks(&dataset, "label_r3", &blocks).unwrap();
        assert_eq!(results.len(), 4);
        for (block, metrics) in &results {
            assert!(block.train_to < block.test_from);
            assert_eq!(metrics.n, 5);
            assert!(metrics.dd_min <= 0.0);
        }

        let dir = TempDir::new().unwrap();
        let adapter = JsonReportAdapter::new(dir.path());
        adapter
            .write_wfo_summary("itest", "label_r3", &config, &results)
            .unwrap();

        let json = fs::read_to_string(dir.path().join("wfo_itest.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["blocks"].as_array().unwrap().len(), 4);
        assert_eq!(value["params"]["block_days"], 5);

        let md = fs::read_to_string(dir.path().join("wfo_itest.md")).unwrap();
        let data_rows = md.lines().filter(|l| l.starts_with("| 2")).count();
        assert_eq!(data_rows, 4);
    }

    #[test]
    fn sparse_data_skips_blocks_but_keeps_the_run() {
        // data only covers the first week of a two-month plan
        let dataset = column_dataset("label_r3", &[0.01, 0.02, 0.03]);
        let config = WfoConfig {
            from: date(2025, 1, 1),
            to: date(2025, 3, 1),
            block_days: 7,
            gap_days: 0,
        };
        let blocks = plan_blocks(&config);
        let results = evaluate_blocks(&dataset, "label_r3", &blocks).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].1.n, 3);
    }
}

mod data_and_config_adapters {
    use super::*;
    use sigtrader::adapters::ini_config::IniConfigAdapter;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn csv_to_dataset_to_simulation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ohlcv.csv");
        fs::write(
            &path,
            "date,open,high,low,close,volume\n\
             2025-01-01,100,101,99,101,1000\n\
             2025-01-02,101,103,100,102,1000\n\
             2025-01-03,102,102,98,99,1000\n",
        )
        .unwrap();

        let port = CsvDataAdapter::new(&path);
        let dataset = port.fetch_dataset(date(2025, 1, 1), date(2025, 2, 1)).unwrap();
        assert_eq!(dataset.len(), 3);

        let bars = bars_from_dataset(&dataset).unwrap();
        let report = simulator::run(
            &bars,
            &SimConfig::default(),
            &sigtrader::domain::simulator::close_over_open_signals(&bars),
        );
        // close>open on bars 1 and 2, so one buy fills; the bar-3 sell
        // signal has no following close
        assert_eq!(report.trades.len(), 1);
    }

    #[test]
    fn ini_defaults_feed_the_mapper() {
        let adapter = IniConfigAdapter::from_string(
            "[mapper]\nup = 0.15\ndn = -0.05\nhysteresis = 0.03\ncooldown_bars = 2\n",
        )
        .unwrap();
        let cfg = build_threshold_config(&adapter, &MapOverrides::default()).unwrap();
        assert_eq!(cfg.up, 0.15);
        assert_eq!(cfg.dn, -0.05);

        let set = map_signals(&[0.2, 0.1, 0.2], &cfg);
        // 0.1 <= up - hysteresis = 0.12, so the long exits on step 1 and
        // the cooldown blocks the step-2 re-entry
        assert_eq!(set.enter_long, vec![1, 0, 0]);
        assert_eq!(set.exit_long, vec![0, 1, 0]);
    }

    #[test]
    fn mock_port_windows_like_a_real_source() {
        let dataset = column_dataset("pred", &[0.1, 0.2, 0.3, 0.4]);
        let port = MockDataPort::new(dataset);
        let window = port.fetch_dataset(date(2025, 1, 2), date(2025, 1, 4)).unwrap();
        assert_eq!(window.column("pred").unwrap(), vec![0.2, 0.3]);

        let failing = MockDataPort::new(column_dataset("pred", &[])).with_error("source down");
        assert!(failing.fetch_dataset(date(2025, 1, 1), date(2025, 2, 1)).is_err());
    }
}

mod metrics_reports {
    use super::*;

    #[test]
    fn metrics_report_from_empty_run_is_all_null() {
        let bars: Vec<OhlcvBar> = vec![];
        let report = simulator::run(&bars, &SimConfig::default(), &[]);
        let metrics = MetricsReport::from_sim_report(&report);
        assert_eq!(metrics.trades_count, 0);
        assert!(metrics.trade_pnl.is_none());
        assert!(metrics.max_drawdown.is_none());
        assert!(metrics.drawdown_summary.is_none());
    }

    #[test]
    fn metrics_report_tracks_a_profitable_round_trip() {
        let bars = vec![
            make_bar(date(2025, 1, 1), 100.0, 100.0),
            make_bar(date(2025, 1, 2), 100.0, 100.0),
            make_bar(date(2025, 1, 3), 100.0, 120.0),
        ];
        use sigtrader::domain::simulator::Signal;
        let signals = [Signal::Buy, Signal::Sell, Signal::Hold];
        let report = simulator::run(&bars, &SimConfig::default(), &signals);
        assert_eq!(report.trades.len(), 2);

        let metrics = MetricsReport::from_sim_report(&report);
        let pnl = metrics.trade_pnl.unwrap();
        assert_eq!(pnl.count, 1);
        assert!(pnl.mean > 0.0);
        assert_eq!(metrics.max_drawdown, max_drawdown(&report.equity));
    }
}
