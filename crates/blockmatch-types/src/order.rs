//! Order types for the BlockMatch engine.
//!
//! Orders are limit orders that rest in the book until they are filled,
//! expire, are cancelled by their sender, or their product is delisted.
//! A partially filled order stays [`OrderStatus::Open`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountId, BlockmatchError, Coin, OrderId, Product, Result};

/// Which side of the book this order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Lifecycle status of an order.
///
/// Every status except `Open` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    Filled,
    Cancelled,
    Expired,
    PartialFilledCancelled,
    PartialFilledExpired,
}

impl OrderStatus {
    #[must_use]
    pub fn is_closed(self) -> bool {
        self != Self::Open
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Filled => write!(f, "FILLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::PartialFilledCancelled => write!(f, "PARTIAL_FILLED_CANCELLED"),
            Self::PartialFilledExpired => write!(f, "PARTIAL_FILLED_EXPIRED"),
        }
    }
}

/// Why an order left the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloseReason {
    /// Remaining quantity reached zero through deals.
    Filled,
    /// The expiry height was reached.
    Expired,
    /// The sender cancelled it.
    Cancelled,
    /// The product was removed from the registry.
    Delisted,
}

impl CloseReason {
    /// Delisting is the only closure that waives the settlement fee.
    #[must_use]
    pub fn charges_settlement_fee(self) -> bool {
        self != Self::Delisted
    }
}

/// A closure event recorded during block processing and settled later in
/// the same block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Closure {
    pub order_id: OrderId,
    pub reason: CloseReason,
}

/// A placement request, before the engine assigns identity and heights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub sender: AccountId,
    pub product: Product,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
}

/// A resting (or closed, not yet purged) limit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub product: Product,
    pub side: OrderSide,
    pub price: Decimal,
    pub quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub status: OrderStatus,
    pub sender: AccountId,
    pub creation_height: u64,
    pub expiry_height: u64,
    /// Settlement fee reserved at placement. Closure charges or releases
    /// exactly this amount, whatever the fee is by then.
    #[serde(default)]
    pub settlement_fee_reserved: Option<Coin>,
}

impl Order {
    /// Materialise a placement request into an `Open` order.
    #[must_use]
    pub fn from_new(id: OrderId, new: NewOrder, expire_blocks: u64) -> Self {
        Self {
            id,
            product: new.product,
            side: new.side,
            price: new.price,
            quantity: new.quantity,
            remaining_quantity: new.quantity,
            status: OrderStatus::Open,
            sender: new.sender,
            creation_height: id.height,
            expiry_height: id.height.saturating_add(expire_blocks),
            settlement_fee_reserved: None,
        }
    }

    /// Reserve `fee` as this order's settlement fee. A zero fee reserves
    /// nothing.
    #[must_use]
    pub fn with_settlement_fee(mut self, fee: &Coin) -> Self {
        self.settlement_fee_reserved = (!fee.is_zero()).then(|| fee.clone());
        self
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.remaining_quantity.is_zero()
    }

    #[must_use]
    pub fn filled_quantity(&self) -> Decimal {
        self.quantity - self.remaining_quantity
    }

    /// Some, but not all, of the quantity has executed.
    #[must_use]
    pub fn is_partially_filled(&self) -> bool {
        !self.remaining_quantity.is_zero() && self.remaining_quantity < self.quantity
    }

    /// Denomination the order pays with.
    #[must_use]
    pub fn spend_denom(&self) -> &str {
        match self.side {
            OrderSide::Buy => self.product.quote(),
            OrderSide::Sell => self.product.base(),
        }
    }

    /// Denomination the order receives.
    #[must_use]
    pub fn receive_denom(&self) -> &str {
        match self.side {
            OrderSide::Buy => self.product.base(),
            OrderSide::Sell => self.product.quote(),
        }
    }

    /// Amount paid when `quantity` executes at the order's price.
    ///
    /// # Errors
    /// `InvariantViolation` if the amount leaves the decimal range.
    pub fn spend_for(&self, quantity: Decimal) -> Result<Decimal> {
        match self.side {
            OrderSide::Buy => self.notional(quantity),
            OrderSide::Sell => Ok(quantity),
        }
    }

    /// Amount received (before fees) when `quantity` executes.
    ///
    /// # Errors
    /// `InvariantViolation` if the amount leaves the decimal range.
    pub fn receive_for(&self, quantity: Decimal) -> Result<Decimal> {
        match self.side {
            OrderSide::Buy => Ok(quantity),
            OrderSide::Sell => self.notional(quantity),
        }
    }

    /// Funds still reserved for the unexecuted part of the order.
    ///
    /// # Errors
    /// `InvariantViolation` if the amount leaves the decimal range.
    pub fn unexecuted_spend(&self) -> Result<Coin> {
        Ok(Coin::new(
            self.spend_denom(),
            self.spend_for(self.remaining_quantity)?,
        ))
    }

    fn notional(&self, quantity: Decimal) -> Result<Decimal> {
        self.price.checked_mul(quantity).ok_or_else(|| {
            BlockmatchError::invariant(format!(
                "{} × {quantity} on order {} overflows",
                self.price, self.id
            ))
        })
    }

    /// Apply an execution of `quantity`. Closes the order as `Filled`
    /// when nothing remains.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if the order is closed or the quantity
    /// is non-positive or exceeds what remains.
    pub fn fill(&mut self, quantity: Decimal) -> Result<()> {
        if !self.is_open() {
            return Err(BlockmatchError::invariant(format!(
                "fill of {quantity} on closed order {} ({})",
                self.id, self.status
            )));
        }
        if quantity <= Decimal::ZERO || quantity > self.remaining_quantity {
            return Err(BlockmatchError::invariant(format!(
                "fill of {quantity} on order {} with {} remaining",
                self.id, self.remaining_quantity
            )));
        }
        self.remaining_quantity -= quantity;
        if self.remaining_quantity.is_zero() {
            self.status = OrderStatus::Filled;
        }
        Ok(())
    }

    /// Close an open order for a reason other than filling.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if the order is already closed, or if
    /// `reason` is [`CloseReason::Filled`] (use [`Order::fill`]).
    pub fn close(&mut self, reason: CloseReason) -> Result<OrderStatus> {
        if !self.is_open() {
            return Err(BlockmatchError::invariant(format!(
                "close of order {} already in {}",
                self.id, self.status
            )));
        }
        let untouched = self.remaining_quantity == self.quantity;
        self.status = match (reason, untouched) {
            (CloseReason::Expired, true) => OrderStatus::Expired,
            (CloseReason::Expired, false) => OrderStatus::PartialFilledExpired,
            (CloseReason::Cancelled | CloseReason::Delisted, true) => OrderStatus::Cancelled,
            (CloseReason::Cancelled | CloseReason::Delisted, false) => {
                OrderStatus::PartialFilledCancelled
            }
            (CloseReason::Filled, _) => {
                return Err(BlockmatchError::invariant(format!(
                    "order {} closed as filled with {} remaining",
                    self.id, self.remaining_quantity
                )));
            }
        };
        Ok(self.status)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// An open order on `btc_usdt` placed at `height` with ordinal `ordinal`.
    pub fn dummy(
        height: u64,
        ordinal: u64,
        side: OrderSide,
        price: Decimal,
        quantity: Decimal,
    ) -> Self {
        let new = NewOrder {
            sender: AccountId::from_bytes([0u8; 16]),
            product: Product::new("btc", "usdt").expect("valid product"),
            side,
            price,
            quantity,
        };
        Self::from_new(OrderId::new(height, ordinal), new, crate::constants::DEFAULT_ORDER_EXPIRE_BLOCKS)
    }
}
