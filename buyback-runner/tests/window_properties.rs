//! Property tests for windowing pre-loaded data.
//!
//! However the window start falls (weekday, weekend, before or inside the
//! series), the run must begin on the first bar at or after it and account
//! for every loaded bar as either warmup or traded.

use buyback_core::engine::EngineConfig;
use buyback_runner::data_loader::{
    compute_dataset_hash, generate_synthetic_bars, DataSource, LoadedData,
};
use buyback_runner::runner::run_backtest_from_data;
use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

fn loaded() -> LoadedData {
    let start = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
    let end = NaiveDate::from_ymd_opt(2022, 12, 30).unwrap();
    let bars = generate_synthetic_bars("WINDOW", start, end);
    LoadedData {
        symbol: "WINDOW".into(),
        dataset_hash: compute_dataset_hash("WINDOW", &bars),
        bars,
        source: DataSource::Synthetic,
        has_synthetic: true,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn window_slice_accounts_for_every_bar(
        offset_days in -30i64..1_000,
        ma_period in 1usize..120,
        wait_days in 0usize..25,
    ) {
        let data = loaded();
        let window_start = data.bars[0].date + Duration::days(offset_days);
        let config = EngineConfig::new(ma_period, wait_days, 10_000.0);

        let result = run_backtest_from_data(&data, Some(window_start), &config).unwrap();

        prop_assert!(result.start_date >= window_start);
        prop_assert_eq!(result.warmup_bars + result.run.bar_count(), data.bars.len());
        prop_assert_eq!(result.start_date, data.bars[result.warmup_bars].date);
        if result.warmup_bars > 0 {
            prop_assert!(data.bars[result.warmup_bars - 1].date < window_start);
        }
        prop_assert_eq!(result.end_date, data.bars[data.bars.len() - 1].date);
    }
}
