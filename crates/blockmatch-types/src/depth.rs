//! Depth book snapshot types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::OrderSide;

/// Aggregate outstanding quantity at one price of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Decimal,
    pub buy_quantity: Decimal,
    pub sell_quantity: Decimal,
}

impl DepthLevel {
    #[must_use]
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            buy_quantity: Decimal::ZERO,
            sell_quantity: Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn quantity(&self, side: OrderSide) -> Decimal {
        match side {
            OrderSide::Buy => self.buy_quantity,
            OrderSide::Sell => self.sell_quantity,
        }
    }

    pub fn quantity_mut(&mut self, side: OrderSide) -> &mut Decimal {
        match side {
            OrderSide::Buy => &mut self.buy_quantity,
            OrderSide::Sell => &mut self.sell_quantity,
        }
    }

    /// Both sides have outstanding quantity, so the level can match.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        self.buy_quantity > Decimal::ZERO && self.sell_quantity > Decimal::ZERO
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buy_quantity.is_zero() && self.sell_quantity.is_zero()
    }
}
