//! Buyback CLI: run, sweep, and data conversion commands.
//!
//! Commands:
//! - `run`: execute one backtest from a TOML config file and/or flags
//! - `sweep`: run a grid of wait budgets and average periods on one series
//! - `convert`: rewrite a CSV bar file as Parquet
//!
//! Logging goes through `env_logger`; set `RUST_LOG=debug` to see every fill.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use buyback_core::engine::{InitialPosition, RuleSet};
use buyback_runner::data_loader::{read_bars_file, write_parquet_bars};
use buyback_runner::export::{export_json, generate_report};
use buyback_runner::{
    format_summary, format_sweep_table, load_bars, run_single_backtest,
    save_artifacts, BacktestConfig, LoadOptions, ParamGrid, ParamSweep,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "buyback",
    about = "Buyback backtester: moving-average exits with a bounded wait to re-enter"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a single backtest.
    Run {
        #[command(flatten)]
        source: SourceArgs,

        /// Moving-average period in bars.
        #[arg(long)]
        ma_period: Option<i64>,

        /// Days to wait in cash before buying back automatically.
        #[arg(long)]
        wait_days: Option<i64>,

        #[arg(long)]
        initial_cash: Option<f64>,

        #[arg(long, value_enum)]
        initial_position: Option<PositionArg>,

        #[arg(long, value_enum)]
        rule: Option<RuleArg>,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Also write a Markdown report next to the artifacts.
        #[arg(long, default_value_t = false)]
        report: bool,

        /// Print the full result as JSON instead of the summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run every (period, wait) combination against the same series.
    Sweep {
        #[command(flatten)]
        source: SourceArgs,

        /// Wait budgets, comma separated.
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, default_values_t = [5i64, 10, 15, 20])]
        wait_days: Vec<i64>,

        /// Average periods, comma separated.
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, default_values_t = [50i64, 100, 200])]
        ma_periods: Vec<i64>,

        /// Run configurations one at a time.
        #[arg(long, default_value_t = false)]
        sequential: bool,
    },
    /// Convert a CSV bar file to Parquet.
    Convert {
        input: PathBuf,
        output: PathBuf,
    },
}

/// Where the bars come from and which window to test.
#[derive(Args)]
struct SourceArgs {
    /// Path to a TOML config file. Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV or Parquet file with date, open and close columns.
    #[arg(long)]
    data: Option<PathBuf>,

    #[arg(long)]
    symbol: Option<String>,

    /// First date of the window (YYYY-MM-DD).
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last date of the window (YYYY-MM-DD).
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Trailing window in years, counted back from the last bar.
    #[arg(long)]
    years: Option<i64>,

    /// Use a seeded random walk instead of a data file.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum PositionArg {
    Long,
    Cash,
}

#[derive(Clone, Copy, ValueEnum)]
enum RuleArg {
    Buyback,
    TrendOnly,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            source,
            ma_period,
            wait_days,
            initial_cash,
            initial_position,
            rule,
            output_dir,
            report,
            json,
        } => {
            let mut config = source.to_config()?;
            let s = &mut config.strategy;
            if let Some(p) = ma_period {
                s.ma_period = p;
            }
            if let Some(w) = wait_days {
                s.wait_days = w;
            }
            if let Some(p) = initial_position {
                s.initial_position = match p {
                    PositionArg::Long => InitialPosition::Long,
                    PositionArg::Cash => InitialPosition::Cash,
                };
            }
            if let Some(r) = rule {
                s.rule = match r {
                    RuleArg::Buyback => RuleSet::Buyback,
                    RuleArg::TrendOnly => RuleSet::TrendOnly,
                };
            }
            if let Some(c) = initial_cash {
                config.backtest.initial_cash = c;
            }
            run_cmd(&config, output_dir, report, json)
        }
        Commands::Sweep {
            source,
            wait_days,
            ma_periods,
            sequential,
        } => {
            let config = source.to_config()?;
            let grid = ParamGrid {
                wait_days,
                ma_periods,
            };
            sweep_cmd(&config, &grid, sequential)
        }
        Commands::Convert { input, output } => convert_cmd(input, output),
    }
}

impl SourceArgs {
    fn to_config(&self) -> Result<BacktestConfig> {
        let mut config = match &self.config {
            Some(path) => BacktestConfig::from_file(path)?,
            None => BacktestConfig::default(),
        };
        let b = &mut config.backtest;
        if let Some(data) = &self.data {
            b.data = Some(data.clone());
        }
        if let Some(symbol) = &self.symbol {
            b.symbol = symbol.clone();
        } else if self.config.is_none() {
            if let Some(stem) = b.data.as_deref().and_then(|p| p.file_stem()) {
                b.symbol = stem.to_string_lossy().to_uppercase();
            }
        }
        if self.start.is_some() {
            b.start_date = self.start;
        }
        if self.end.is_some() {
            b.end_date = self.end;
        }
        if self.years.is_some() {
            b.years = self.years;
        }
        b.synthetic |= self.synthetic;

        if b.data.is_none() && !b.synthetic {
            bail!("one of --data, --synthetic, or a config with `data` is required");
        }
        Ok(config)
    }
}

fn run_cmd(config: &BacktestConfig, output_dir: PathBuf, report: bool, json: bool) -> Result<()> {
    let result = run_single_backtest(config)?;

    if json {
        println!("{}", export_json(&result)?);
    } else {
        print!("{}", format_summary(&result));
    }

    let run_dir = save_artifacts(&result, &output_dir)?;
    if report {
        let path = run_dir.join("report.md");
        std::fs::write(&path, generate_report(&result))
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    if !json {
        println!("Equity curve saved to {}", run_dir.join("equity.csv").display());
    }
    Ok(())
}

fn sweep_cmd(config: &BacktestConfig, grid: &ParamGrid, sequential: bool) -> Result<()> {
    if grid.size() == 0 {
        bail!("--wait-days and --ma-periods must each name at least one value");
    }
    let base = config.to_engine_config()?;
    let opts = LoadOptions {
        path: config.backtest.data.clone(),
        start: None,
        end: config.backtest.end_date,
        synthetic: config.backtest.synthetic,
    };
    let data = load_bars(&config.backtest.symbol, &opts)?;
    let last = data.bars[data.bars.len() - 1].date;
    let window_start = config.window_start(last);

    if let Some(start) = window_start.filter(|s| *s > last) {
        bail!("window start {start} is after the last bar ({last})");
    }

    let results = ParamSweep::new()
        .with_parallelism(!sequential)
        .sweep(grid, &base, &data, window_start);

    println!(
        "{} sweep: {} configurations, {} failed",
        data.symbol,
        results.len(),
        results.failed_count()
    );
    print!("{}", format_sweep_table(&results));
    Ok(())
}

fn convert_cmd(input: PathBuf, output: PathBuf) -> Result<()> {
    let (bars, _) = read_bars_file(&input)?;
    write_parquet_bars(&output, &bars)?;
    println!(
        "Wrote {} bars from {} to {}",
        bars.len(),
        input.display(),
        output.display()
    );
    Ok(())
}
