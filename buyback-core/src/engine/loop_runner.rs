//! Bar-by-bar simulation loop.
//!
//! Three phases per bar:
//! 1. Open: fill the order scheduled at the previous close
//! 2. Close: mark equity, record the trace row
//! 3. Decide: run the state machine on this bar's signal, schedule any trade

use crate::data::validate_series;
use crate::domain::{Portfolio, PositionSide, PositionState, PriceBar, TradeSide};
use crate::error::EngineError;
use crate::indicators::{Indicator, Sma};
use crate::metrics::MetricsResult;
use crate::signals::{detect_signals, Signal};

use super::config::EngineConfig;
use super::equity::{benchmark_curve, opening_portfolio, EquityPoint};
use super::ledger::TradeLedger;
use super::pending::PendingOrder;
use super::state::{on_fill, transition, BarRecord, RunResult, ScheduledOrder};

/// Run a backtest over `bars` with a simple moving average of
/// `config.ma_period` closes.
pub fn run_backtest(bars: &[PriceBar], config: &EngineConfig) -> Result<RunResult, EngineError> {
    config.validate()?;
    let sma = Sma::new(config.ma_period);
    let ma = sma.compute(bars);
    run_with_average(bars, &ma, config)
}

/// Run a backtest against a precomputed moving-average series.
///
/// `ma` must be aligned 1:1 with `bars`; `None` marks bars where the average
/// is not yet defined. `config.ma_period` is not consulted for the average
/// itself, only validated.
pub fn run_with_average(
    bars: &[PriceBar],
    ma: &[Option<f64>],
    config: &EngineConfig,
) -> Result<RunResult, EngineError> {
    config.validate()?;
    validate_series(bars, config.max_gap_days)?;
    if ma.len() != bars.len() {
        return Err(EngineError::InvalidConfig(format!(
            "moving average has {} values for {} bars",
            ma.len(),
            bars.len()
        )));
    }

    if ma.iter().all(Option::is_none) {
        log::warn!(
            "insufficient history: {} bars, moving average period {}; staying in cash",
            bars.len(),
            config.ma_period
        );
        return Ok(flat_cash_run(bars, ma, config));
    }

    let signals = detect_signals(bars, ma);
    let num_bars = bars.len();

    // Bar 0 is the opening position; a long start buys at its close.
    let first = &bars[0];
    let initial_side = config.initial_position.state().side();
    let mut portfolio = opening_portfolio(initial_side, config.initial_cash, first.close);
    let mut state = config.initial_position.state();
    let mut pending = PendingOrder::new();
    let mut ledger = TradeLedger::new();
    let mut trace = Vec::with_capacity(num_bars);
    let mut equity_curve = Vec::with_capacity(num_bars);

    for (i, bar) in bars.iter().enumerate() {
        // ─── Phase 1: open ───
        if let Some(order) = pending.take_for(i) {
            match order.side {
                TradeSide::Buy => portfolio.buy_all(bar.open),
                TradeSide::Sell => portfolio.sell_all(bar.open),
            }
            state = on_fill(order.side);
            ledger.record_fill(&order, i, bar, &portfolio);
            log::debug!(
                "{:?} ({:?}) signalled {} filled {} at {:.4}",
                order.side,
                order.reason,
                order.signal_date,
                bar.date,
                bar.open
            );
        }

        // ─── Phase 2: close ───
        let equity = portfolio.value(state.side(), bar.close);
        equity_curve.push(EquityPoint {
            date: bar.date,
            value: equity,
        });
        trace.push(BarRecord {
            bar_index: i,
            date: bar.date,
            open: bar.open,
            close: bar.close,
            ma: ma[i],
            signal: signals[i],
            state,
            equity,
        });

        // ─── Phase 3: decide ───
        let (next, decision) = transition(state, signals[i], config);
        state = next;
        if let Some(decision) = decision {
            pending.schedule(ScheduledOrder {
                side: decision.side,
                reason: decision.reason,
                signal_bar: i,
                signal_date: bar.date,
            });
        }
    }

    if let Some(order) = pending.take_unfilled() {
        log::info!(
            "{:?} ({:?}) signalled on {} has no next bar; recorded as pending",
            order.side,
            order.reason,
            order.signal_date
        );
        ledger.record_pending(&order, &portfolio);
    }

    let benchmark = benchmark_curve(bars, config.initial_cash);
    let metrics = MetricsResult::compute(&equity_curve, &benchmark, &ledger);

    log::info!(
        "run complete: {} bars, {} trades, total return {:.2}%",
        num_bars,
        metrics.trade_count,
        metrics.total_return * 100.0
    );

    Ok(RunResult {
        config: config.clone(),
        initial_side,
        trace,
        ledger,
        equity_curve,
        benchmark_curve: benchmark,
        metrics,
        insufficient_history: false,
    })
}

/// Result for a series too short to define the average: capital is never
/// deployed and every bar reads cash with a zero counter.
fn flat_cash_run(bars: &[PriceBar], ma: &[Option<f64>], config: &EngineConfig) -> RunResult {
    let portfolio = Portfolio::all_cash(config.initial_cash);
    let state = PositionState::Cash { wait_counter: 0 };

    let equity_curve: Vec<EquityPoint> = bars
        .iter()
        .map(|bar| EquityPoint {
            date: bar.date,
            value: portfolio.cash,
        })
        .collect();

    let trace = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| BarRecord {
            bar_index: i,
            date: bar.date,
            open: bar.open,
            close: bar.close,
            ma: ma.get(i).copied().flatten(),
            signal: Signal::None,
            state,
            equity: portfolio.cash,
        })
        .collect();

    let ledger = TradeLedger::new();
    let benchmark = benchmark_curve(bars, config.initial_cash);
    let metrics = MetricsResult::compute(&equity_curve, &benchmark, &ledger);

    RunResult {
        config: config.clone(),
        initial_side: PositionSide::Cash,
        trace,
        ledger,
        equity_curve,
        benchmark_curve: benchmark,
        metrics,
        insufficient_history: true,
    }
}
