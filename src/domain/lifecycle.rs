//! Order status transition rules and their stock side effects.
//!
//! Stock moves exactly once per transition edge: entering CANCELLED
//! restores every line's quantity, leaving CANCELLED reserves it again.
//! Every other edge leaves stock untouched, so repeating a transition
//! is a stock no-op.

use crate::models::OrderStatus;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StockEffect {
    /// Increment each product's stock by the line quantity.
    Restore,
    /// Decrement each product's stock by the line quantity; every
    /// decrement must be conditional on sufficient stock and the whole
    /// transition aborts when any line fails.
    Reserve,
    None,
}

pub fn stock_effect(from: OrderStatus, to: OrderStatus) -> StockEffect {
    match (from, to) {
        (f, OrderStatus::Cancelled) if f != OrderStatus::Cancelled => StockEffect::Restore,
        (OrderStatus::Cancelled, t) if t != OrderStatus::Cancelled => StockEffect::Reserve,
        _ => StockEffect::None,
    }
}

/// Orders are deleted only after cancellation; item rows go with them.
pub fn deletable(status: OrderStatus) -> bool {
    status == OrderStatus::Cancelled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderStatus::*;

    #[test]
    fn cancelling_restores_from_any_live_state() {
        for from in [Pending, Processing, Shipped, Delivered] {
            assert_eq!(stock_effect(from, Cancelled), StockEffect::Restore);
        }
    }

    #[test]
    fn repeated_cancel_is_a_stock_noop() {
        assert_eq!(stock_effect(Cancelled, Cancelled), StockEffect::None);
    }

    #[test]
    fn reinstating_reserves_again() {
        for to in [Pending, Processing, Shipped, Delivered] {
            assert_eq!(stock_effect(Cancelled, to), StockEffect::Reserve);
        }
    }

    #[test]
    fn forward_progress_leaves_stock_alone() {
        assert_eq!(stock_effect(Pending, Processing), StockEffect::None);
        assert_eq!(stock_effect(Processing, Shipped), StockEffect::None);
        assert_eq!(stock_effect(Shipped, Delivered), StockEffect::None);
        assert_eq!(stock_effect(Pending, Pending), StockEffect::None);
    }

    #[test]
    fn only_cancelled_orders_are_deletable() {
        assert!(deletable(Cancelled));
        assert!(!deletable(Pending));
        assert!(!deletable(Delivered));
    }
}
