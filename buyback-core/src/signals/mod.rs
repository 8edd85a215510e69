//! Signal detection: price vs moving-average crossovers.
//!
//! Signals are evaluated at a bar's close and only ever look at that bar and
//! the one before it. They never see portfolio state.

pub mod cross;

pub use cross::{classify, detect_signals, Signal};
