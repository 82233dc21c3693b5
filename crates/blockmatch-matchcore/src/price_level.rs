//! One side of one price level.
//!
//! Order IDs at the same (product, price, side) are kept in arrival order
//! (time priority) in a [`VecDeque`].

use std::collections::VecDeque;

use blockmatch_types::{OrderId, OrderSide};
use rust_decimal::Decimal;

/// FIFO queue of the orders resting at one price on one side.
///
/// The front has the highest time priority and is filled first.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    pub price: Decimal,
    pub side: OrderSide,
    orders: VecDeque<OrderId>,
}

impl PriceLevel {
    #[must_use]
    pub fn new(price: Decimal, side: OrderSide) -> Self {
        Self {
            price,
            side,
            orders: VecDeque::new(),
        }
    }

    /// Add an order at the back (lowest time priority).
    pub fn push_back(&mut self, order_id: OrderId) {
        self.orders.push_back(order_id);
    }

    #[must_use]
    pub fn front(&self) -> Option<&OrderId> {
        self.orders.front()
    }

    /// Remove an order by ID. O(position); matching drains from the front.
    pub fn remove_order(&mut self, order_id: &OrderId) -> bool {
        if self.orders.front() == Some(order_id) {
            self.orders.pop_front();
            return true;
        }
        match self.orders.iter().position(|id| id == order_id) {
            Some(pos) => self.orders.remove(pos).is_some(),
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrderId> {
        self.orders.iter()
    }

    /// The queue as a vector, front first.
    #[must_use]
    pub fn order_ids(&self) -> Vec<OrderId> {
        self.orders.iter().copied().collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level() -> PriceLevel {
        PriceLevel::new(Decimal::new(100, 1), OrderSide::Sell)
    }

    #[test]
    fn push_front_fifo() {
        let mut level = level();
        level.push_back(OrderId::new(10, 2));
        level.push_back(OrderId::new(10, 3));
        assert_eq!(level.len(), 2);
        assert_eq!(level.front(), Some(&OrderId::new(10, 2)), "first in is first out");
    }

    #[test]
    fn remove_head_and_middle() {
        let mut level = level();
        for ordinal in 1..=4 {
            level.push_back(OrderId::new(1, ordinal));
        }
        assert!(level.remove_order(&OrderId::new(1, 1)));
        assert!(level.remove_order(&OrderId::new(1, 3)));
        assert_eq!(level.order_ids(), vec![OrderId::new(1, 2), OrderId::new(1, 4)]);
    }

    #[test]
    fn remove_nonexistent_order() {
        let mut level = level();
        level.push_back(OrderId::new(1, 1));
        assert!(!level.remove_order(&OrderId::new(2, 1)));
        assert_eq!(level.len(), 1);
    }

    #[test]
    fn empty_level() {
        let level = level();
        assert!(level.is_empty());
        assert_eq!(level.len(), 0);
        assert!(level.front().is_none());
        assert_eq!(level.iter().count(), 0);
    }
}
