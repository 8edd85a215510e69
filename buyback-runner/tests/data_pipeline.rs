//! Integration tests for the runner's data pipeline: files on disk through
//! to a finished backtest.

use std::fmt::Write as _;
use std::path::Path;

use buyback_core::domain::PriceBar;
use buyback_core::EngineError;
use buyback_runner::config::BacktestConfig;
use buyback_runner::data_loader::{
    generate_synthetic_bars, load_bars, read_bars_file, write_parquet_bars, DataSource, LoadError,
    LoadOptions,
};
use buyback_runner::runner::{run_single_backtest, RunError};
use chrono::NaiveDate;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn fixture_bars() -> Vec<PriceBar> {
    generate_synthetic_bars("FIXTURE", d(2019, 1, 2), d(2023, 12, 29))
}

fn write_csv(path: &Path, bars: &[PriceBar]) {
    let mut text = String::from("Date,Open,High,Low,Close,Volume\n");
    for b in bars {
        let _ = writeln!(
            text,
            "{},{},{},{},{},1000",
            b.date,
            b.open,
            b.open.max(b.close),
            b.open.min(b.close),
            b.close
        );
    }
    std::fs::write(path, text).unwrap();
}

#[test]
fn csv_and_parquet_load_the_same_series() {
    let dir = tempfile::tempdir().unwrap();
    let bars = fixture_bars();
    let csv_path = dir.path().join("FIX.csv");
    let pq_path = dir.path().join("FIX.parquet");
    write_csv(&csv_path, &bars);
    write_parquet_bars(&pq_path, &bars).unwrap();

    let (from_csv, csv_source) = read_bars_file(&csv_path).unwrap();
    let (from_pq, pq_source) = read_bars_file(&pq_path).unwrap();

    assert_eq!(csv_source, DataSource::Csv);
    assert_eq!(pq_source, DataSource::Parquet);
    assert_eq!(from_pq, bars);
    assert_eq!(from_csv.len(), bars.len());
    for (a, b) in from_csv.iter().zip(&bars) {
        assert_eq!(a.date, b.date);
        assert!((a.open - b.open).abs() < 1e-9);
        assert!((a.close - b.close).abs() < 1e-9);
    }
}

#[test]
fn load_clips_to_requested_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("FIX.parquet");
    write_parquet_bars(&path, &fixture_bars()).unwrap();

    let opts = LoadOptions {
        path: Some(path),
        start: Some(d(2021, 1, 1)),
        end: Some(d(2021, 12, 31)),
        synthetic: false,
    };
    let loaded = load_bars("FIX", &opts).unwrap();
    assert!(!loaded.has_synthetic);
    assert!(loaded.bars.iter().all(|b| b.date.format("%Y").to_string() == "2021"));
    assert_eq!(loaded.dataset_hash.len(), 64);
}

#[test]
fn missing_close_column_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(&path, "date,open\n2024-01-02,100\n").unwrap();
    let err = read_bars_file(&path).unwrap_err();
    assert!(matches!(err, LoadError::MissingColumn { ref column } if column == "close"));
}

#[test]
fn config_file_runs_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("FIX.csv");
    write_csv(&data_path, &fixture_bars());

    let config_path = dir.path().join("backtest.toml");
    let toml = format!(
        "[backtest]\nsymbol = \"FIX\"\ndata = {:?}\nyears = 3\ninitial_cash = 5000.0\n\n\
         [strategy]\nma_period = 100\nwait_days = 10\n",
        data_path.display().to_string()
    );
    std::fs::write(&config_path, toml).unwrap();

    let config = BacktestConfig::from_file(&config_path).unwrap();
    let result = run_single_backtest(&config).unwrap();

    assert_eq!(result.symbol, "FIX");
    assert_eq!(result.data_source, DataSource::Csv);
    assert_eq!(result.end_date, d(2023, 12, 29));
    assert!(result.start_date >= d(2020, 12, 29));
    assert!(result.warmup_bars > 100);
    assert!(!result.run.insufficient_history);
    assert_eq!(result.run.equity_curve[0].value, 5_000.0);
    assert_eq!(result.run.benchmark_curve[0].value, 5_000.0);
}

#[test]
fn weekend_row_in_file_is_an_engine_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weekend.csv");
    // 2024-01-06 is a Saturday
    std::fs::write(
        &path,
        "date,open,close\n2024-01-04,100,101\n2024-01-05,101,102\n2024-01-06,102,103\n",
    )
    .unwrap();

    let mut config = BacktestConfig::default();
    config.backtest.data = Some(path);
    config.strategy.ma_period = 2;
    let err = run_single_backtest(&config).unwrap_err();
    assert!(matches!(
        err,
        RunError::Engine(EngineError::WeekendBar { index: 2, .. })
    ));
}

#[test]
fn no_data_and_no_synthetic_is_an_error() {
    let config = BacktestConfig::default();
    let err = run_single_backtest(&config).unwrap_err();
    assert!(matches!(err, RunError::Data(LoadError::NoSource { .. })));
}

#[test]
fn synthetic_run_is_tagged() {
    let mut config = BacktestConfig::default();
    config.backtest.synthetic = true;
    config.backtest.years = Some(5);
    let result = run_single_backtest(&config).unwrap();
    assert!(result.has_synthetic);
    assert_eq!(result.data_source, DataSource::Synthetic);
}
