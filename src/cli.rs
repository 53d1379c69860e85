//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_data::CsvDataAdapter;
use crate::adapters::ini_config::{DefaultConfig, IniConfigAdapter};
use crate::adapters::json_report::JsonReportAdapter;
use crate::adapters::markers::{
    format_perf_marker, format_signals_marker, parse_markers, stability_inputs_from,
};
use crate::domain::config_validation::{
    validate_mapper_config, validate_simulator_config, validate_walkforward_config,
};
use crate::domain::dataset::Dataset;
use crate::domain::error::SigtraderError;
use crate::domain::mapper::{map_signals, ExitBand, SignalSet, ThresholdConfig};
use crate::domain::metrics::{max_drawdown, signal_stats, stability_score};
use crate::domain::ohlcv::{bars_from_dataset, synthesize_bars, LabelKind, OhlcvBar};
use crate::domain::simulator::{
    self, close_over_open_signals, signals_from_set, SimConfig, SimReport,
};
use crate::domain::walkforward::{evaluate_blocks, plan_blocks, WfoConfig};
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "sigtrader", about = "Prediction-to-trade signal pipeline")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Map a prediction column to entry/exit signals
    Map {
        #[arg(short, long)]
        input: PathBuf,
        /// Prediction column name
        #[arg(long)]
        column: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        up: Option<f64>,
        #[arg(long)]
        dn: Option<f64>,
        #[arg(long)]
        hysteresis: Option<f64>,
        #[arg(long)]
        cooldown_bars: Option<u32>,
        /// Exit band convention: full or half
        #[arg(long)]
        exit_band: Option<String>,
        /// Destination for the signals CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Destination for a markdown summary with machine markers
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Run the paper-trade simulator over OHLCV bars
    Simulate {
        #[arg(short, long)]
        input: PathBuf,
        /// Label column to synthesize prices from when OHLCV is absent
        #[arg(long)]
        column: Option<String>,
        /// Mapped signals CSV; default strategy is close-over-open
        #[arg(long)]
        signals: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        initial_cash: Option<f64>,
        #[arg(long)]
        fee: Option<f64>,
        #[arg(long)]
        slippage_pct: Option<f64>,
        /// Output directory for the trade report and trades CSV
        #[arg(short, long, default_value = "outputs")]
        out_dir: PathBuf,
        /// Destination for a markdown summary with machine markers
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Plan walk-forward blocks and evaluate a label column per block
    Wfo {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        block_days: Option<u32>,
        #[arg(long)]
        gap_days: Option<u32>,
        #[arg(long, default_value = "run")]
        run_tag: String,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long, default_value = "outputs")]
        out_dir: PathBuf,
    },
    /// Derive compact metrics from a trade report JSON
    Metrics {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, default_value = "outputs")]
        out_dir: PathBuf,
    },
    /// Score summary files by their embedded markers
    Stability {
        #[arg(long, num_args = 1..)]
        summaries: Vec<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Map {
            input,
            column,
            config,
            up,
            dn,
            hysteresis,
            cooldown_bars,
            exit_band,
            output,
            summary,
        } => run_map(
            &input,
            &column,
            config.as_ref(),
            MapOverrides {
                up,
                dn,
                hysteresis,
                cooldown_bars,
                exit_band,
            },
            output.as_ref(),
            summary.as_ref(),
        ),
        Command::Simulate {
            input,
            column,
            signals,
            config,
            initial_cash,
            fee,
            slippage_pct,
            out_dir,
            summary,
        } => run_simulate(
            &input,
            column.as_deref(),
            signals.as_ref(),
            config.as_ref(),
            SimOverrides {
                initial_cash,
                fee,
                slippage_pct,
            },
            &out_dir,
            summary.as_ref(),
        ),
        Command::Wfo {
            input,
            label,
            from,
            to,
            block_days,
            gap_days,
            run_tag,
            config,
            out_dir,
        } => run_wfo(
            &input,
            label.as_deref(),
            config.as_ref(),
            WfoOverrides {
                from,
                to,
                block_days,
                gap_days,
            },
            &run_tag,
            &out_dir,
        ),
        Command::Metrics { input, out_dir } => run_metrics(&input, &out_dir),
        Command::Stability { summaries } => run_stability(&summaries),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<IniConfigAdapter, ExitCode> {
    IniConfigAdapter::from_file(path).map_err(|e| {
        let err = SigtraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn load_config_or_default(path: Option<&PathBuf>) -> Result<Box<dyn ConfigPort>, ExitCode> {
    match path {
        Some(p) => {
            eprintln!("Loading config from {}", p.display());
            Ok(Box::new(load_config(p)?))
        }
        None => Ok(Box::new(DefaultConfig)),
    }
}

#[derive(Debug, Default)]
pub struct MapOverrides {
    pub up: Option<f64>,
    pub dn: Option<f64>,
    pub hysteresis: Option<f64>,
    pub cooldown_bars: Option<u32>,
    pub exit_band: Option<String>,
}

#[derive(Debug, Default)]
pub struct SimOverrides {
    pub initial_cash: Option<f64>,
    pub fee: Option<f64>,
    pub slippage_pct: Option<f64>,
}

#[derive(Debug, Default)]
pub struct WfoOverrides {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub block_days: Option<u32>,
    pub gap_days: Option<u32>,
}

fn parse_exit_band(value: &str) -> Result<ExitBand, SigtraderError> {
    match value {
        "full" => Ok(ExitBand::Full),
        "half" => Ok(ExitBand::Half),
        _ => Err(SigtraderError::ConfigInvalid {
            section: "mapper".into(),
            key: "exit_band".into(),
            reason: "exit_band must be 'full' or 'half'".into(),
        }),
    }
}

/// Config file supplies defaults, flags win.
pub fn build_threshold_config(
    adapter: &dyn ConfigPort,
    overrides: &MapOverrides,
) -> Result<ThresholdConfig, SigtraderError> {
    let base = ThresholdConfig::default();
    let exit_band = match overrides
        .exit_band
        .clone()
        .or_else(|| adapter.get_string("mapper", "exit_band"))
    {
        Some(s) => parse_exit_band(&s)?,
        None => base.exit_band,
    };
    Ok(ThresholdConfig {
        up: overrides
            .up
            .unwrap_or_else(|| adapter.get_double("mapper", "up", base.up)),
        dn: overrides
            .dn
            .unwrap_or_else(|| adapter.get_double("mapper", "dn", base.dn)),
        hysteresis: overrides
            .hysteresis
            .unwrap_or_else(|| adapter.get_double("mapper", "hysteresis", base.hysteresis)),
        cooldown_bars: overrides.cooldown_bars.unwrap_or_else(|| {
            adapter.get_int("mapper", "cooldown_bars", base.cooldown_bars as i64) as u32
        }),
        exit_band,
    })
}

pub fn build_sim_config(adapter: &dyn ConfigPort, overrides: &SimOverrides) -> SimConfig {
    let base = SimConfig::default();
    SimConfig {
        initial_cash: overrides
            .initial_cash
            .unwrap_or_else(|| adapter.get_double("simulator", "initial_cash", base.initial_cash)),
        fee: overrides
            .fee
            .unwrap_or_else(|| adapter.get_double("simulator", "fee", base.fee)),
        slippage_pct: overrides.slippage_pct.unwrap_or_else(|| {
            adapter.get_double("simulator", "slippage_pct", base.slippage_pct)
        }),
    }
}

pub fn build_wfo_config(
    adapter: &dyn ConfigPort,
    overrides: &WfoOverrides,
) -> Result<WfoConfig, SigtraderError> {
    let from = match overrides.from {
        Some(d) => d,
        None => parse_config_date(adapter, "from")?,
    };
    let to = match overrides.to {
        Some(d) => d,
        None => parse_config_date(adapter, "to")?,
    };
    let block_days = overrides
        .block_days
        .unwrap_or_else(|| adapter.get_int("walkforward", "block_days", 30).max(0) as u32);
    let gap_days = overrides
        .gap_days
        .unwrap_or_else(|| adapter.get_int("walkforward", "gap_days", 0).max(0) as u32);

    if block_days < 1 {
        return Err(SigtraderError::ConfigInvalid {
            section: "walkforward".into(),
            key: "block_days".into(),
            reason: "block_days must be at least 1".into(),
        });
    }
    if from >= to {
        return Err(SigtraderError::ConfigInvalid {
            section: "walkforward".into(),
            key: "from".into(),
            reason: "from must be before to".into(),
        });
    }

    Ok(WfoConfig {
        from,
        to,
        block_days,
        gap_days,
    })
}

fn parse_config_date(adapter: &dyn ConfigPort, key: &str) -> Result<NaiveDate, SigtraderError> {
    let value = adapter.get_string("walkforward", key).ok_or_else(|| {
        SigtraderError::ConfigMissing {
            section: "walkforward".into(),
            key: key.into(),
        }
    })?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| SigtraderError::ConfigInvalid {
        section: "walkforward".into(),
        key: key.into(),
        reason: "invalid date format (expected YYYY-MM-DD)".into(),
    })
}

fn load_dataset(path: &PathBuf) -> Result<Dataset, ExitCode> {
    eprintln!("Loading dataset from {}", path.display());
    CsvDataAdapter::new(path).load().map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

fn run_map(
    input: &PathBuf,
    column: &str,
    config_path: Option<&PathBuf>,
    overrides: MapOverrides,
    output: Option<&PathBuf>,
    summary: Option<&PathBuf>,
) -> ExitCode {
    // Stage 1: Load and validate config
    let adapter = match load_config_or_default(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_mapper_config(adapter.as_ref()) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    let threshold_config = match build_threshold_config(adapter.as_ref(), &overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 2: Load predictions
    let dataset = match load_dataset(input) {
        Ok(d) => d,
        Err(code) => return code,
    };
    let preds = match dataset.column(column) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 3: Map and summarize
    eprintln!(
        "Mapping {} predictions (up={}, dn={}, hysteresis={}, cooldown={})",
        preds.len(),
        threshold_config.up,
        threshold_config.dn,
        threshold_config.hysteresis,
        threshold_config.cooldown_bars,
    );
    let set = map_signals(&preds, &threshold_config);
    let stats = signal_stats(&set, threshold_config.cooldown_bars);

    // Stage 4: Write outputs
    if let Some(out) = output {
        if let Err(e) = write_signals_csv(out, &dataset, &set) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("Signals written to {}", out.display());
    }
    if let Some(path) = summary {
        let md = format!(
            "# Signal summary\n\n{}\n\nEntries: {}, exits: {}, trigger rate {:.4}\n",
            format_signals_marker(&stats),
            stats.entries,
            stats.exits,
            stats.trigger_rate,
        );
        if let Err(e) = fs::write(path, md) {
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
        eprintln!("Summary written to {}", path.display());
    }

    match serde_json::to_string_pretty(&stats) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("error: failed to serialize stats: {e}");
            return ExitCode::from(1);
        }
    }
    ExitCode::SUCCESS
}

fn write_signals_csv(
    path: &PathBuf,
    dataset: &Dataset,
    set: &SignalSet,
) -> Result<(), SigtraderError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| SigtraderError::Report {
        reason: format!("failed to write {}: {}", path.display(), e),
    })?;
    wtr.write_record(["date", "enter_long", "enter_short", "exit_long", "exit_short"])
        .map_err(|e| SigtraderError::Report {
            reason: format!("failed to write header: {}", e),
        })?;
    for (i, row) in dataset.rows.iter().enumerate() {
        wtr.write_record([
            row.date.to_string(),
            set.enter_long[i].to_string(),
            set.enter_short[i].to_string(),
            set.exit_long[i].to_string(),
            set.exit_short[i].to_string(),
        ])
        .map_err(|e| SigtraderError::Report {
            reason: format!("failed to write signal row: {}", e),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

fn signal_set_from_dataset(dataset: &Dataset) -> Result<SignalSet, SigtraderError> {
    let to_flags = |name: &str| -> Result<Vec<u8>, SigtraderError> {
        Ok(dataset
            .column(name)?
            .into_iter()
            .map(|v| (v != 0.0 && !v.is_nan()) as u8)
            .collect())
    };
    Ok(SignalSet {
        enter_long: to_flags("enter_long")?,
        enter_short: to_flags("enter_short")?,
        exit_long: to_flags("exit_long")?,
        exit_short: to_flags("exit_short")?,
    })
}

fn resolve_bars(dataset: &Dataset, column: Option<&str>) -> Result<Vec<OhlcvBar>, SigtraderError> {
    if ["open", "high", "low", "close", "volume"]
        .iter()
        .all(|c| dataset.has_column(c))
    {
        return bars_from_dataset(dataset);
    }
    let column = column.ok_or_else(|| SigtraderError::MissingColumn {
        column: "close".to_string(),
    })?;
    let idx = dataset
        .column_index(column)
        .ok_or_else(|| SigtraderError::MissingColumn {
            column: column.to_string(),
        })?;
    let labels: Vec<(NaiveDate, f64)> = dataset
        .rows
        .iter()
        .map(|r| (r.date, r.values[idx]))
        .collect();
    eprintln!("No OHLCV columns, synthesizing prices from '{}'", column);
    Ok(synthesize_bars(&labels, LabelKind::infer(column)))
}

fn run_simulate(
    input: &PathBuf,
    column: Option<&str>,
    signals_path: Option<&PathBuf>,
    config_path: Option<&PathBuf>,
    overrides: SimOverrides,
    out_dir: &PathBuf,
    summary: Option<&PathBuf>,
) -> ExitCode {
    // Stage 1: Load and validate config
    let adapter = match load_config_or_default(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_simulator_config(adapter.as_ref()) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    let sim_config = build_sim_config(adapter.as_ref(), &overrides);

    // Stage 2: Load bars
    let dataset = match load_dataset(input) {
        Ok(d) => d,
        Err(code) => return code,
    };
    let bars = match resolve_bars(&dataset, column) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 3: Resolve signal stream
    let mapped_set = match signals_path {
        Some(path) => {
            let signal_ds = match load_dataset(path) {
                Ok(d) => d,
                Err(code) => return code,
            };
            match signal_set_from_dataset(&signal_ds) {
                Ok(s) => Some(s),
                Err(e) => {
                    eprintln!("error: {e}");
                    return (&e).into();
                }
            }
        }
        None => None,
    };
    let signals = match &mapped_set {
        Some(set) => signals_from_set(set),
        None => close_over_open_signals(&bars),
    };

    // Stage 4: Run simulation
    eprintln!("Simulating {} bars", bars.len());
    let report = simulator::run(&bars, &sim_config, &signals);

    eprintln!("\n=== Simulation Results ===");
    eprintln!("Initial cash:   {:.2}", report.initial_cash);
    eprintln!("Final net:      {:.2}", report.final_net);
    eprintln!("Open position:  {}", report.position);
    eprintln!("Trades:         {}", report.trades.len());
    if let Some(dd) = max_drawdown(&report.equity) {
        eprintln!("Max drawdown:   {:.2}%", dd * 100.0);
    }

    // Stage 5: Write report
    if let Err(e) = fs::create_dir_all(out_dir) {
        eprintln!("error: {e}");
        return ExitCode::from(1);
    }
    let report_port = JsonReportAdapter::new(out_dir);
    if let Err(e) = report_port.write_trade_report(&report) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("Trade report written to {}", out_dir.display());

    if let Some(path) = summary {
        let mut md = String::from("# Paper trade summary\n\n");
        if let Some(set) = &mapped_set {
            let cooldown = adapter.get_int("mapper", "cooldown_bars", 3).max(0) as u32;
            md.push_str(&format_signals_marker(&signal_stats(set, cooldown)));
            md.push('\n');
        }
        if let Some(dd) = max_drawdown(&report.equity) {
            md.push_str(&format_perf_marker(dd));
            md.push('\n');
        }
        if let Err(e) = fs::write(path, md) {
            eprintln!("error: {e}");
            return ExitCode::from(1);
        }
        eprintln!("Summary written to {}", path.display());
    }
    ExitCode::SUCCESS
}

fn run_wfo(
    input: &PathBuf,
    label: Option<&str>,
    config_path: Option<&PathBuf>,
    overrides: WfoOverrides,
    run_tag: &str,
    out_dir: &PathBuf,
) -> ExitCode {
    // Stage 1: Resolve config
    let adapter = match load_config_or_default(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let wfo_config = match build_wfo_config(adapter.as_ref(), &overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let label = match label
        .map(str::to_string)
        .or_else(|| adapter.get_string("walkforward", "label"))
    {
        Some(l) => l,
        None => {
            let e = SigtraderError::ConfigMissing {
                section: "walkforward".into(),
                key: "label".into(),
            };
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 2: Load dataset and plan blocks
    let dataset = match load_dataset(input) {
        Ok(d) => d,
        Err(code) => return code,
    };
    let blocks = plan_blocks(&wfo_config);
    eprintln!(
        "Planned {} blocks over {} to {} (block_days={}, gap_days={})",
        blocks.len(),
        wfo_config.from,
        wfo_config.to,
        wfo_config.block_days,
        wfo_config.gap_days,
    );

    // Stage 3: Evaluate
    let results = match evaluate_blocks(&dataset, &label, &blocks) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Evaluated {} non-empty blocks", results.len());

    // Stage 4: Write summary
    if let Err(e) = fs::create_dir_all(out_dir) {
        eprintln!("error: {e}");
        return ExitCode::from(1);
    }
    let report_port = JsonReportAdapter::new(out_dir);
    if let Err(e) = report_port.write_wfo_summary(run_tag, &label, &wfo_config, &results) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("Walk-forward summary written to {}", out_dir.display());
    ExitCode::SUCCESS
}

fn run_metrics(input: &PathBuf, out_dir: &PathBuf) -> ExitCode {
    eprintln!("Reading trade report from {}", input.display());
    let text = match fs::read_to_string(input) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: failed to read {}: {}", input.display(), e);
            return ExitCode::from(1);
        }
    };
    let report: SimReport = match serde_json::from_str(&text) {
        Ok(r) => r,
        Err(e) => {
            let err = SigtraderError::Data {
                reason: format!("invalid trade report: {}", e),
            };
            eprintln!("error: {err}");
            return (&err).into();
        }
    };

    if let Err(e) = fs::create_dir_all(out_dir) {
        eprintln!("error: {e}");
        return ExitCode::from(1);
    }
    let report_port = JsonReportAdapter::new(out_dir);
    if let Err(e) = report_port.write_metrics(&report) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("Metrics written to {}", out_dir.display());
    ExitCode::SUCCESS
}

fn run_stability(summaries: &[PathBuf]) -> ExitCode {
    if summaries.is_empty() {
        eprintln!("error: at least one summary file is required");
        return ExitCode::from(2);
    }

    let mut scores = Vec::with_capacity(summaries.len());
    for path in summaries {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("error: failed to read {}: {}", path.display(), e);
                return ExitCode::from(1);
            }
        };
        let inputs = stability_inputs_from(&parse_markers(&text));
        let score = stability_score(&inputs);
        println!(
            "{}",
            serde_json::json!({
                "file": path.display().to_string(),
                "stability_score": score,
            })
        );
        scores.push(score);
    }

    let avg = (scores.iter().map(|&s| s as f64).sum::<f64>() / scores.len() as f64).round();
    println!("{}", serde_json::json!({ "aggregate_avg": avg as u32 }));
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_mapper_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = validate_simulator_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if adapter.get_string("walkforward", "from").is_some() {
        if let Err(e) = validate_walkforward_config(&adapter) {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }
    eprintln!("Config validated successfully");
    ExitCode::SUCCESS
}
