//! Criterion benchmarks for the engine hot paths.
//!
//! Benchmarks:
//! 1. Full backtest (SMA + signals + bar loop + metrics)
//! 2. SMA precompute
//! 3. Ledger replay into an equity curve

use buyback_core::domain::PriceBar;
use buyback_core::engine::{build_equity_curve, run_backtest, EngineConfig};
use buyback_core::indicators::{Indicator, Sma};
use chrono::{Datelike, Weekday};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<PriceBar> {
    let mut date = chrono::NaiveDate::from_ymd_opt(1995, 1, 3).unwrap();
    let mut bars = Vec::with_capacity(n);
    let mut prev = 100.0;
    for i in 0..n {
        let close = 100.0 + (i as f64 * 0.02).sin() * 25.0 + (i as f64 * 0.3).cos() * 3.0;
        bars.push(PriceBar::new(date, prev, close));
        prev = close;
        date = date.succ_opt().unwrap();
        while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date = date.succ_opt().unwrap();
        }
    }
    bars
}

// ── 1. Full backtest ─────────────────────────────────────────────────

fn bench_backtest(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtest");
    for &n in &[1_260usize, 7_500] {
        let bars = make_bars(n);
        let config = EngineConfig::new(200, 10, 10_000.0);
        group.bench_with_input(BenchmarkId::new("ma200_wait10", n), &bars, |b, bars| {
            b.iter(|| run_backtest(black_box(bars), black_box(&config)))
        });
    }
    group.finish();
}

// ── 2. SMA precompute ────────────────────────────────────────────────

fn bench_sma(c: &mut Criterion) {
    let bars = make_bars(7_500);
    let mut group = c.benchmark_group("sma");
    for &period in &[50usize, 200] {
        let sma = Sma::new(period);
        group.bench_with_input(BenchmarkId::from_parameter(period), &bars, |b, bars| {
            b.iter(|| sma.compute(black_box(bars)))
        });
    }
    group.finish();
}

// ── 3. Ledger replay ─────────────────────────────────────────────────

fn bench_replay(c: &mut Criterion) {
    let bars = make_bars(7_500);
    let config = EngineConfig::new(50, 5, 10_000.0);
    let Ok(result) = run_backtest(&bars, &config) else {
        return;
    };
    c.bench_function("replay_7500_bars", |b| {
        b.iter(|| {
            build_equity_curve(
                black_box(&bars),
                black_box(result.ledger.trades()),
                result.initial_side,
                config.initial_cash,
            )
        })
    });
}

criterion_group!(benches, bench_backtest, bench_sma, bench_replay);
criterion_main!(benches);
