//! Reporting and export: JSON, CSV, and text artifacts.
//!
//! Provides export formats for backtest results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade ledger and day-by-day equity for external analysis tools
//! - **Text/Markdown**: the console summary and a single-run report
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use buyback_core::domain::{PositionState, Trade, TradeSide};
use buyback_core::engine::BarRecord;
use buyback_core::signals::Signal;

use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::sweep::{SweepOutcome, SweepResults};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the trade ledger as CSV. Pending trades have empty execution
/// columns.
///
/// Columns: side, reason, status, signal_bar, signal_date, execution_bar,
/// execution_date, execution_price, shares_after, cash_after
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "side",
        "reason",
        "status",
        "signal_bar",
        "signal_date",
        "execution_bar",
        "execution_date",
        "execution_price",
        "shares_after",
        "cash_after",
    ])?;

    for t in trades {
        wtr.write_record([
            side_label(t).to_string(),
            format!("{:?}", t.reason),
            format!("{:?}", t.status),
            t.signal_bar.to_string(),
            t.signal_date.to_string(),
            t.execution_bar.map(|b| b.to_string()).unwrap_or_default(),
            t.execution_date.map(|d| d.to_string()).unwrap_or_default(),
            t.execution_price
                .map(|p| format!("{p:.6}"))
                .unwrap_or_default(),
            format!("{:.6}", t.shares_after),
            format!("{:.2}", t.cash_after),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn side_label(t: &Trade) -> &'static str {
    match t.side {
        TradeSide::Buy => "BUY",
        TradeSide::Sell => "SELL",
    }
}

/// Export the day-by-day trace alongside the benchmark.
///
/// Columns: date, equity, benchmark, position, wait_counter, close, sma, signal
pub fn export_equity_csv(result: &BacktestResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "equity",
        "benchmark",
        "position",
        "wait_counter",
        "close",
        "sma",
        "signal",
    ])?;

    let run = &result.run;
    for (row, bench) in run.trace.iter().zip(&run.benchmark_curve) {
        wtr.write_record([
            row.date.to_string(),
            format!("{:.2}", row.equity),
            format!("{:.2}", bench.value),
            position_label(row).to_string(),
            row.state.wait_counter().to_string(),
            format!("{:.4}", row.close),
            row.ma.map(|m| format!("{m:.4}")).unwrap_or_default(),
            signal_label(row.signal).to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn position_label(row: &BarRecord) -> &'static str {
    match row.state {
        PositionState::Long => "LONG",
        PositionState::Cash { .. } => "CASH",
    }
}

fn signal_label(signal: Signal) -> &'static str {
    match signal {
        Signal::None => "",
        Signal::CrossAbove => "CROSS_ABOVE",
        Signal::CrossBelow => "CROSS_BELOW",
    }
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates a directory named `{symbol}_ma{period}_w{wait}_{run_id[..12]}/`
/// under `output_dir` containing:
/// - `manifest.json`: the full `BacktestResult`
/// - `trades.csv`: trade ledger
/// - `equity.csv`: day-by-day equity, benchmark and position
///
/// The name is derived from the run id, so re-running the same
/// configuration overwrites its own artifacts. Returns the directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let short_id: String = result.run_id.chars().take(12).collect();
    let dirname = format!(
        "{}_ma{}_w{}_{}",
        result.symbol, result.run.config.ma_period, result.run.config.wait_days, short_id
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(result)?;
    write_file(&run_dir.join("manifest.json"), &json)?;

    let trades_csv = export_trades_csv(result.run.ledger.trades())?;
    write_file(&run_dir.join("trades.csv"), &trades_csv)?;

    let equity_csv = export_equity_csv(result)?;
    write_file(&run_dir.join("equity.csv"), &equity_csv)?;

    log::info!("artifacts written to {}", run_dir.display());
    Ok(run_dir)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Console summary ────────────────────────────────────────────────

fn pct(x: f64) -> String {
    format!("{:.2}%", x * 100.0)
}

/// Dollar amount with thousands separators, e.g. `$12,345.67`.
pub fn dollars(x: f64) -> String {
    let cents = format!("{:.2}", x.abs());
    let (whole, frac) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if x < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{frac}")
}

/// Plain-text summary printed after a run.
pub fn format_summary(result: &BacktestResult) -> String {
    let run = &result.run;
    let m = &run.metrics;
    let mut out = String::new();

    let _ = writeln!(out, "{}", result.title());
    let _ = writeln!(
        out,
        "Symbol: {}  MA Period: {}  Wait Days: {}",
        result.symbol, run.config.ma_period, run.config.wait_days
    );
    let _ = writeln!(
        out,
        "Period: {} → {}  (~{} months)",
        result.start_date,
        result.end_date,
        (m.years_elapsed * 12.0) as i64
    );
    let _ = writeln!(
        out,
        "Initial: {}  Final: {}",
        dollars(m.initial_value),
        dollars(m.final_value)
    );
    let cagr = m.cagr.map(pct).unwrap_or_else(|| "n/a".into());
    let _ = writeln!(out, "Total Return: {}  CAGR: {}", pct(m.total_return), cagr);
    let _ = writeln!(
        out,
        "Max Drawdown: {}  Trades: {}",
        pct(m.max_drawdown),
        m.trade_count
    );
    let _ = writeln!(out, "Benchmark Final: {}", dollars(m.benchmark_final));

    if let Some(pending) = run.ledger.pending() {
        let _ = writeln!(
            out,
            "Pending: {} ({:?}) signalled {}, fills at the next open",
            side_label(pending),
            pending.reason,
            pending.signal_date
        );
    }
    if run.insufficient_history {
        let _ = writeln!(
            out,
            "Warning: fewer bars than the {}-day average; stayed in cash",
            run.config.ma_period
        );
    }
    if result.has_synthetic {
        let _ = writeln!(out, "Data: SYNTHETIC");
    }
    out
}

/// One line per sweep configuration, best total return first.
pub fn format_sweep_table(results: &SweepResults) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>6} {:>5} {:>10} {:>8} {:>9} {:>7} {:>14}",
        "MA", "Wait", "Return", "CAGR", "MaxDD", "Trades", "Final"
    );
    for r in results.ranked() {
        let m = &r.run.metrics;
        let _ = writeln!(
            out,
            "{:>6} {:>5} {:>10} {:>8} {:>9} {:>7} {:>14}",
            r.run.config.ma_period,
            r.run.config.wait_days,
            pct(m.total_return),
            m.cagr.map(pct).unwrap_or_else(|| "n/a".into()),
            pct(m.max_drawdown),
            m.trade_count,
            dollars(m.final_value)
        );
    }
    for outcome in results.outcomes() {
        match outcome {
            SweepOutcome::Failed { point, error } => {
                let _ = writeln!(
                    out,
                    "{:>6} {:>5}  failed: {error}",
                    point.ma_period, point.wait_days
                );
            }
            SweepOutcome::Cancelled { point } => {
                let _ = writeln!(
                    out,
                    "{:>6} {:>5}  cancelled",
                    point.ma_period, point.wait_days
                );
            }
            SweepOutcome::Completed(_) => {}
        }
    }
    out
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let run = &result.run;
    let m = &run.metrics;
    let mut md = String::with_capacity(2048);

    md.push_str(&format!("# {}\n\n", result.title()));

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbol | {} |\n", result.symbol));
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        result.start_date, result.end_date
    ));
    md.push_str(&format!(
        "| Bars | {} ({} warmup) |\n",
        run.bar_count(),
        result.warmup_bars
    ));
    md.push_str(&format!("| Initial Position | {:?} |\n", run.initial_side));
    md.push_str(&format!("| Rule | {:?} |\n", run.config.rule));
    md.push_str(&format!("| Run ID | {} |\n", result.run_id));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Strategy | Buy & Hold |\n");
    md.push_str("| --- | --- | --- |\n");
    md.push_str(&format!(
        "| Final Value | {} | {} |\n",
        dollars(m.final_value),
        dollars(m.benchmark_final)
    ));
    md.push_str(&format!(
        "| Total Return | {} | {} |\n",
        pct(m.total_return),
        pct(m.benchmark_total_return)
    ));
    md.push_str(&format!(
        "| CAGR | {} | |\n",
        m.cagr.map(pct).unwrap_or_else(|| "n/a".into())
    ));
    md.push_str(&format!("| Max Drawdown | {} | |\n", pct(m.max_drawdown)));
    md.push_str(&format!(
        "| Trades | {} ({} pending) | |\n",
        m.trade_count, m.pending_trades
    ));
    md.push('\n');

    if !run.ledger.is_empty() {
        md.push_str("## Trades\n\n");
        md.push_str("| Side | Reason | Signal | Executed | Price |\n");
        md.push_str("| --- | --- | --- | --- | --- |\n");
        for t in run.ledger.trades() {
            md.push_str(&format!(
                "| {} | {:?} | {} | {} | {} |\n",
                side_label(t),
                t.reason,
                t.signal_date,
                t.execution_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "pending".into()),
                t.execution_price
                    .map(|p| format!("{p:.2}"))
                    .unwrap_or_default()
            ));
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::{compute_dataset_hash, generate_synthetic_bars, DataSource, LoadedData};
    use crate::runner::run_backtest_from_data;
    use buyback_core::engine::EngineConfig;
    use chrono::NaiveDate;

    fn sample_result() -> BacktestResult {
        let start = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 12, 29).unwrap();
        let bars = generate_synthetic_bars("SPY", start, end);
        let data = LoadedData {
            symbol: "SPY".into(),
            dataset_hash: compute_dataset_hash("SPY", &bars),
            bars,
            source: DataSource::Synthetic,
            has_synthetic: true,
        };
        run_backtest_from_data(&data, None, &EngineConfig::new(50, 10, 10_000.0)).unwrap()
    }

    #[test]
    fn json_round_trip_keeps_ledger() {
        let result = sample_result();
        let json = export_json(&result).unwrap();
        assert!(json.contains("\"schema_version\": 1"));
        let back = import_json(&json).unwrap();
        assert_eq!(back.run_id, result.run_id);
        assert_eq!(back.run.ledger.len(), result.run.ledger.len());
        assert_eq!(back.run.trace.len(), result.run.trace.len());
        assert_eq!(back.data_source, DataSource::Synthetic);
    }

    #[test]
    fn reloaded_manifest_keeps_exact_floats() {
        let result = sample_result();
        let back = import_json(&export_json(&result).unwrap()).unwrap();

        let bits = |curve: &[buyback_core::engine::EquityPoint]| -> Vec<u64> {
            curve.iter().map(|p| p.value.to_bits()).collect()
        };
        assert_eq!(bits(&back.run.equity_curve), bits(&result.run.equity_curve));
        assert_eq!(bits(&back.run.benchmark_curve), bits(&result.run.benchmark_curve));
        assert_eq!(back.run.ledger, result.run.ledger);
        assert_eq!(back.run.metrics, result.run.metrics);
    }

    #[test]
    fn future_schema_rejected() {
        let mut result = sample_result();
        result.schema_version = SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&result).unwrap();
        assert!(import_json(&json).is_err());
    }

    #[test]
    fn trades_csv_has_one_row_per_ledger_entry() {
        let result = sample_result();
        let csv = export_trades_csv(result.run.ledger.trades()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[0].starts_with("side,reason,status"));
        assert_eq!(lines.len(), result.run.ledger.len() + 1);
    }

    #[test]
    fn equity_csv_has_one_row_per_bar() {
        let result = sample_result();
        let csv = export_equity_csv(&result).unwrap();
        assert_eq!(csv.lines().count(), result.run.bar_count() + 1);
        let first = csv.lines().nth(1).unwrap();
        assert!(first.starts_with("2021-01-04,10000.00,10000.00,LONG,0,"));
    }

    #[test]
    fn dollars_groups_thousands() {
        assert_eq!(dollars(0.0), "$0.00");
        assert_eq!(dollars(999.999), "$1,000.00");
        assert_eq!(dollars(1_234_567.891), "$1,234,567.89");
        assert_eq!(dollars(-12_500.5), "-$12,500.50");
    }

    #[test]
    fn summary_matches_console_layout() {
        let result = sample_result();
        let text = format_summary(&result);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Buyback-10 Strategy (MA50) Summary");
        assert_eq!(lines[1], "Symbol: SPY  MA Period: 50  Wait Days: 10");
        assert!(lines[2].starts_with("Period: 2021-01-04 → 2023-12-29"));
        assert!(lines[3].starts_with("Initial: $10,000.00  Final: $"));
        assert!(lines[6].starts_with("Benchmark Final: $"));
        assert!(text.contains("Data: SYNTHETIC"));
    }

    #[test]
    fn report_lists_every_trade() {
        let result = sample_result();
        let md = generate_report(&result);
        assert!(md.starts_with("# Buyback-10 Strategy (MA50) Summary"));
        let trade_rows = md
            .lines()
            .filter(|l| l.starts_with("| BUY") || l.starts_with("| SELL"))
            .count();
        assert_eq!(trade_rows, result.run.ledger.len());
    }
}
