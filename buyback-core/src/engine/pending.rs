//! One-slot buffer for the market-on-open order decided at the previous close.
//!
//! Orders go in at bar T's close and can only come out at the start of bar
//! T+1, so a signal can never be filled on the bar that produced it.

use super::state::ScheduledOrder;

#[derive(Debug, Default)]
pub struct PendingOrder {
    slot: Option<ScheduledOrder>,
}

impl PendingOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an order for the next open.
    ///
    /// The state machine emits at most one decision per bar and the slot is
    /// drained at the start of every bar, so it is always empty here.
    pub fn schedule(&mut self, order: ScheduledOrder) {
        debug_assert!(
            self.slot.is_none(),
            "pending slot already holds an order from bar {}",
            self.slot.map(|o| o.signal_bar).unwrap_or_default()
        );
        self.slot = Some(order);
    }

    /// Remove the queued order for filling at `bar_index`'s open.
    pub fn take_for(&mut self, bar_index: usize) -> Option<ScheduledOrder> {
        let order = self.slot.take()?;
        debug_assert_eq!(
            order.signal_bar + 1,
            bar_index,
            "order must fill exactly one bar after its signal"
        );
        Some(order)
    }

    /// Drain whatever is left once the series has ended.
    pub fn take_unfilled(&mut self) -> Option<ScheduledOrder> {
        self.slot.take()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}
