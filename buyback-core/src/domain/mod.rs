//! Domain types for the buyback engine

pub mod bar;
pub mod position;
pub mod trade;

pub use bar::PriceBar;
pub use position::{Portfolio, PositionSide, PositionState};
pub use trade::{FillStatus, Trade, TradeReason, TradeSide};
