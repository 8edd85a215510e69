//! Bar loading for the runner.
//!
//! Resolves a symbol's daily series from one of three sources:
//! 1. A CSV file with at least `date,open,close` columns
//! 2. A Parquet file with `date` (Date), `open` and `close` (f64) columns
//! 3. `--synthetic`: a seeded random walk (tagged)
//!
//! Synthetic data is a developer-only debug mode. Results produced on
//! synthetic data are tagged in every artifact.
//!
//! Loading does not repair anything. Sorting, gap and weekend checks are the
//! engine's job, so bad files surface as engine validation errors.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use buyback_core::domain::PriceBar;
use chrono::{Datelike, Duration, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("missing column '{column}'")]
    MissingColumn { column: String },

    #[error("bad value on row {row}: {reason}")]
    BadRow { row: usize, reason: String },

    #[error("unsupported data file '{}' (expected .csv or .parquet)", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("no data source for '{symbol}' (pass a data file or use --synthetic)")]
    NoSource { symbol: String },

    #[error("no bars for '{symbol}' between {start} and {end}")]
    EmptyWindow {
        symbol: String,
        start: String,
        end: String,
    },
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Csv,
    Parquet,
    Synthetic,
}

/// Options controlling how bars are loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// File to read. Required unless `synthetic` is set.
    pub path: Option<PathBuf>,
    /// Inclusive lower bound applied after loading.
    pub start: Option<NaiveDate>,
    /// Inclusive upper bound applied after loading.
    pub end: Option<NaiveDate>,
    /// Generate synthetic bars instead of reading a file.
    pub synthetic: bool,
}

/// Result of loading bars, including data source provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
    pub source: DataSource,
    /// Dataset hash for fingerprinting (BLAKE3 over all bar data).
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

/// First date of the synthetic series when no start is given.
fn synthetic_default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 2).unwrap_or(NaiveDate::MIN)
}

/// Last date of the synthetic series when no end is given.
fn synthetic_default_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or(NaiveDate::MIN)
}

/// Load the full series for `symbol`, then clip it to `[start, end]`.
pub fn load_bars(symbol: &str, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let (bars, source) = if opts.synthetic {
        log::warn!("generating synthetic data for {symbol}; results will be tagged as synthetic");
        let start = opts.start.unwrap_or_else(synthetic_default_start);
        let end = opts.end.unwrap_or_else(synthetic_default_end);
        (generate_synthetic_bars(symbol, start, end), DataSource::Synthetic)
    } else {
        let path = opts.path.as_deref().ok_or_else(|| LoadError::NoSource {
            symbol: symbol.to_string(),
        })?;
        read_bars_file(path)?
    };

    let bars = filter_range(bars, opts.start, opts.end);
    if bars.is_empty() {
        return Err(LoadError::EmptyWindow {
            symbol: symbol.to_string(),
            start: opts.start.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            end: opts.end.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        });
    }

    let dataset_hash = compute_dataset_hash(symbol, &bars);
    log::info!(
        "loaded {} bars for {symbol} ({:?}) {} .. {}",
        bars.len(),
        source,
        bars[0].date,
        bars[bars.len() - 1].date
    );

    Ok(LoadedData {
        symbol: symbol.to_string(),
        bars,
        source,
        dataset_hash,
        has_synthetic: source == DataSource::Synthetic,
    })
}

/// Read a bar file, choosing the format from its extension.
pub fn read_bars_file(path: &Path) -> Result<(Vec<PriceBar>, DataSource), LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => {
            let file = fs::File::open(path).map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Ok((read_csv_bars(file)?, DataSource::Csv))
        }
        Some("parquet") | Some("pq") => Ok((read_parquet_bars(path)?, DataSource::Parquet)),
        _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    }
}

// ── CSV ──────────────────────────────────────────────────────────────

/// Parse CSV bars. Header names are matched case-insensitively; columns other
/// than date/open/close are ignored.
pub fn read_csv_bars<R: Read>(reader: R) -> Result<Vec<PriceBar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| LoadError::MissingColumn {
                column: name.to_string(),
            })
    };
    let date_idx = find("date")?;
    let open_idx = find("open")?;
    let close_idx = find("close")?;

    let mut bars = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // header is row 1
        let row = i + 2;
        let field = |idx: usize, name: &str| {
            record.get(idx).ok_or_else(|| LoadError::BadRow {
                row,
                reason: format!("missing {name}"),
            })
        };

        let date_str = field(date_idx, "date")?;
        let date = parse_date(date_str).ok_or_else(|| LoadError::BadRow {
            row,
            reason: format!("unparseable date '{date_str}'"),
        })?;
        let open = parse_price(field(open_idx, "open")?, row, "open")?;
        let close = parse_price(field(close_idx, "close")?, row, "close")?;

        bars.push(PriceBar::new(date, open, close));
    }

    Ok(bars)
}

/// ISO dates, optionally with a trailing time component.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let day = s.split(['T', ' ']).next().unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_price(s: &str, row: usize, name: &str) -> Result<f64, LoadError> {
    s.parse::<f64>().map_err(|_| LoadError::BadRow {
        row,
        reason: format!("unparseable {name} '{s}'"),
    })
}

// ── Parquet ──────────────────────────────────────────────────────────

/// Read a Parquet file with `date`, `open` and `close` columns.
pub fn read_parquet_bars(path: &Path) -> Result<Vec<PriceBar>, LoadError> {
    let file = fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| LoadError::Parquet(format!("read: {e}")))?;

    for col_name in ["date", "open", "close"] {
        if df.column(col_name).is_err() {
            return Err(LoadError::MissingColumn {
                column: col_name.to_string(),
            });
        }
    }

    dataframe_to_bars(&df)
}

/// Write bars as Parquet with the layout `read_parquet_bars` expects.
pub fn write_parquet_bars(path: &Path, bars: &[PriceBar]) -> Result<(), LoadError> {
    let epoch = unix_epoch();
    let dates: Vec<i32> = bars
        .iter()
        .map(|b| (b.date - epoch).num_days() as i32)
        .collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let mut df = DataFrame::new(vec![
        Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| LoadError::Parquet(format!("date cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("close".into(), closes),
    ])
    .map_err(|e| LoadError::Parquet(format!("dataframe creation: {e}")))?;

    let file = fs::File::create(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .map_err(|e| LoadError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<PriceBar>, LoadError> {
    let map_err = |e: PolarsError| LoadError::Parquet(format!("column read: {e}"));

    let dates = df.column("date").map_err(map_err)?;
    let opens = df.column("open").map_err(map_err)?;
    let closes = df.column("close").map_err(map_err)?;

    let date_ca = dates
        .date()
        .map_err(|e| LoadError::Parquet(format!("date column type: {e}")))?;
    let open_ca = opens
        .f64()
        .map_err(|e| LoadError::Parquet(format!("open column type: {e}")))?;
    let close_ca = closes
        .f64()
        .map_err(|e| LoadError::Parquet(format!("close column type: {e}")))?;

    let epoch = unix_epoch();
    let n = df.height();
    let mut bars = Vec::with_capacity(n);

    for i in 0..n {
        let date_days = date_ca.get(i).ok_or_else(|| LoadError::BadRow {
            row: i,
            reason: "null date".into(),
        })?;
        let date = epoch + Duration::days(date_days as i64);

        // Nulls become NaN and are rejected by engine validation.
        bars.push(PriceBar::new(
            date,
            open_ca.get(i).unwrap_or(f64::NAN),
            close_ca.get(i).unwrap_or(f64::NAN),
        ));
    }

    Ok(bars)
}

fn unix_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

// ── Windowing and provenance ─────────────────────────────────────────

/// Keep bars with `start <= date <= end`.
pub fn filter_range(
    bars: Vec<PriceBar>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<PriceBar> {
    bars.into_iter()
        .filter(|b| start.map_or(true, |s| b.date >= s) && end.map_or(true, |e| b.date <= e))
        .collect()
}

/// Compute a deterministic BLAKE3 hash over the symbol and every bar.
pub fn compute_dataset_hash(symbol: &str, bars: &[PriceBar]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(symbol.as_bytes());
    for bar in bars {
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Generate synthetic bars for testing/development.
///
/// A random walk from 100.0 over weekdays, seeded from the symbol name so
/// the same symbol always yields the same series.
pub fn generate_synthetic_bars(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<PriceBar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::new();
    let mut price = 100.0_f64;
    let mut current = start;

    while current <= end {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += Duration::days(1);
            continue;
        }

        // small positive drift, overnight gap folded into the open
        let gap: f64 = rng.gen_range(-0.005..0.005);
        let daily_return: f64 = rng.gen_range(-0.02..0.0205);
        let open = price * (1.0 + gap);
        let close = open * (1.0 + daily_return);

        bars.push(PriceBar::new(current, open, close));
        price = close;
        current += Duration::days(1);
    }

    bars
}
