//! Busy-market continuation state.
//!
//! A [`ProductLock`] exists for a product exactly while a price-level
//! settlement that hit the per-block deal cap is still unfinished. It is
//! persisted between blocks; it is not a mutex.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::OrderSide;

/// Negotiated match carried over to later blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLock {
    /// Height the interrupted auction started at.
    pub block_height: u64,
    /// Clearing price of the interrupted level.
    pub price: Decimal,
    /// Trade quantity both sides must reach.
    pub quantity: Decimal,
    pub buy_executed: Decimal,
    pub sell_executed: Decimal,
}

impl ProductLock {
    /// A fresh settlement at `price` for `quantity`, nothing executed yet.
    #[must_use]
    pub fn new(block_height: u64, price: Decimal, quantity: Decimal) -> Self {
        Self {
            block_height,
            price,
            quantity,
            buy_executed: Decimal::ZERO,
            sell_executed: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn executed(&self, side: OrderSide) -> Decimal {
        match side {
            OrderSide::Buy => self.buy_executed,
            OrderSide::Sell => self.sell_executed,
        }
    }

    /// Quantity still to allocate on `side`.
    #[must_use]
    pub fn outstanding(&self, side: OrderSide) -> Decimal {
        self.quantity - self.executed(side)
    }

    pub fn record(&mut self, side: OrderSide, quantity: Decimal) {
        match side {
            OrderSide::Buy => self.buy_executed += quantity,
            OrderSide::Sell => self.sell_executed += quantity,
        }
    }

    /// Both sides reached the negotiated quantity.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.buy_executed == self.quantity && self.sell_executed == self.quantity
    }
}
