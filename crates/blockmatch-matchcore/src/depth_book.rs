//! The depth book.
//!
//! Per product, a [`ProductBook`] keeps:
//! - **Levels**: `BTreeMap<Decimal, DepthLevel>` with aggregate Buy and Sell
//!   quantity per price, ascending
//! - **Queues**: one [`PriceLevel`] FIFO of order IDs per (price, side)
//! - **Index**: `BTreeMap<OrderId, Slot>` holding each resting order's side,
//!   price and remaining quantity, for O(log N) reduce and removal
//!
//! Aggregates move with every insert, fill and removal; nothing is ever
//! recomputed from scratch. Queues touched since the last flush are tracked
//! so the caller can persist only what changed.

use std::collections::{BTreeMap, BTreeSet};

use blockmatch_types::{BlockmatchError, DepthLevel, Order, OrderId, OrderSide, Product, Result};
use rust_decimal::Decimal;

use crate::price_level::PriceLevel;

/// Where a resting order sits, and how much of it is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    side: OrderSide,
    price: Decimal,
    remaining: Decimal,
}

/// Depth book of a single product.
#[derive(Debug, Clone)]
pub struct ProductBook {
    product: Product,
    levels: BTreeMap<Decimal, DepthLevel>,
    buys: BTreeMap<Decimal, PriceLevel>,
    sells: BTreeMap<Decimal, PriceLevel>,
    index: BTreeMap<OrderId, Slot>,
    dirty: BTreeSet<(Decimal, OrderSide)>,
}

impl ProductBook {
    #[must_use]
    pub fn new(product: Product) -> Self {
        Self {
            product,
            levels: BTreeMap::new(),
            buys: BTreeMap::new(),
            sells: BTreeMap::new(),
            index: BTreeMap::new(),
            dirty: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn product(&self) -> &Product {
        &self.product
    }

    // =================================================================
    // Mutation
    // =================================================================

    /// Add an open order's remaining quantity and queue it at the back.
    pub fn insert_order(&mut self, order: &Order) -> Result<()> {
        if order.product != self.product {
            return Err(BlockmatchError::invariant(format!(
                "order {} for {} inserted into {} book",
                order.id, order.product, self.product
            )));
        }
        if !order.is_open() || order.remaining_quantity <= Decimal::ZERO {
            return Err(BlockmatchError::invariant(format!(
                "order {} inserted with status {} and remaining {}",
                order.id, order.status, order.remaining_quantity
            )));
        }
        if self.index.contains_key(&order.id) {
            return Err(BlockmatchError::invariant(format!(
                "order {} already in the depth book",
                order.id
            )));
        }

        let (side, price) = (order.side, order.price);
        let resting = self
            .levels
            .get(&price)
            .map_or(Decimal::ZERO, |level| level.quantity(side));
        let total = resting
            .checked_add(order.remaining_quantity)
            .ok_or_else(|| BlockmatchError::AmountOverflow {
                denom: self.product.base().to_string(),
            })?;
        *self
            .levels
            .entry(price)
            .or_insert_with(|| DepthLevel::new(price))
            .quantity_mut(side) = total;
        self.queues_mut(side)
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price, side))
            .push_back(order.id);
        self.index.insert(
            order.id,
            Slot {
                side,
                price,
                remaining: order.remaining_quantity,
            },
        );
        self.dirty.insert((price, side));
        Ok(())
    }

    /// Apply an execution of `quantity`. A fully executed order leaves its
    /// queue. Returns the order's remaining quantity.
    pub fn reduce_order(&mut self, order_id: &OrderId, quantity: Decimal) -> Result<Decimal> {
        let slot = self
            .index
            .get_mut(order_id)
            .ok_or(BlockmatchError::DealOrderMissing(*order_id))?;
        if quantity <= Decimal::ZERO || quantity > slot.remaining {
            return Err(BlockmatchError::invariant(format!(
                "reduce of {quantity} on order {order_id} with {} remaining",
                slot.remaining
            )));
        }
        slot.remaining -= quantity;
        let Slot {
            side,
            price,
            remaining,
        } = *slot;

        self.take_from_level(price, side, quantity)?;
        if remaining.is_zero() {
            self.index.remove(order_id);
            self.dequeue(price, side, order_id)?;
        }
        self.dirty.insert((price, side));
        Ok(remaining)
    }

    /// Take an order out entirely (cancellation, expiry, delisting).
    /// Returns the remaining quantity it held.
    pub fn remove_order(&mut self, order_id: &OrderId) -> Result<Decimal> {
        let slot = self
            .index
            .remove(order_id)
            .ok_or(BlockmatchError::OrderNotFound(*order_id))?;
        self.take_from_level(slot.price, slot.side, slot.remaining)?;
        self.dequeue(slot.price, slot.side, order_id)?;
        self.dirty.insert((slot.price, slot.side));
        Ok(slot.remaining)
    }

    fn take_from_level(&mut self, price: Decimal, side: OrderSide, quantity: Decimal) -> Result<()> {
        let level = self.levels.get_mut(&price).ok_or_else(|| {
            BlockmatchError::invariant(format!("{} has no depth level at {price}", self.product))
        })?;
        let aggregate = level.quantity_mut(side);
        if *aggregate < quantity {
            return Err(BlockmatchError::invariant(format!(
                "{} {side} depth at {price} is {aggregate}, cannot take {quantity}",
                self.product
            )));
        }
        *aggregate -= quantity;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Ok(())
    }

    fn dequeue(&mut self, price: Decimal, side: OrderSide, order_id: &OrderId) -> Result<()> {
        let queues = self.queues_mut(side);
        let removed = queues
            .get_mut(&price)
            .is_some_and(|queue| queue.remove_order(order_id));
        if !removed {
            return Err(BlockmatchError::invariant(format!(
                "order {order_id} missing from {side} queue at {price}"
            )));
        }
        if queues.get(&price).is_some_and(PriceLevel::is_empty) {
            queues.remove(&price);
        }
        Ok(())
    }

    fn queues(&self, side: OrderSide) -> &BTreeMap<Decimal, PriceLevel> {
        match side {
            OrderSide::Buy => &self.buys,
            OrderSide::Sell => &self.sells,
        }
    }

    fn queues_mut(&mut self, side: OrderSide) -> &mut BTreeMap<Decimal, PriceLevel> {
        match side {
            OrderSide::Buy => &mut self.buys,
            OrderSide::Sell => &mut self.sells,
        }
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn level(&self, price: &Decimal) -> Option<&DepthLevel> {
        self.levels.get(price)
    }

    /// All levels, ascending by price.
    #[must_use]
    pub fn snapshot(&self) -> Vec<DepthLevel> {
        self.levels.values().cloned().collect()
    }

    /// Prices with outstanding quantity on both sides, ascending.
    #[must_use]
    pub fn matching_prices(&self) -> Vec<Decimal> {
        self.levels
            .values()
            .filter(|level| level.is_crossed())
            .map(|level| level.price)
            .collect()
    }

    #[must_use]
    pub fn queue(&self, price: &Decimal, side: OrderSide) -> Option<&PriceLevel> {
        self.queues(side).get(price)
    }

    /// Queue contents, front first; empty if the queue does not exist.
    #[must_use]
    pub fn order_ids(&self, price: &Decimal, side: OrderSide) -> Vec<OrderId> {
        self.queue(price, side)
            .map(PriceLevel::order_ids)
            .unwrap_or_default()
    }

    /// Oldest order at (price, side).
    #[must_use]
    pub fn head(&self, price: &Decimal, side: OrderSide) -> Option<OrderId> {
        self.queue(price, side).and_then(|q| q.front().copied())
    }

    /// Remaining quantity of a resting order.
    #[must_use]
    pub fn remaining(&self, order_id: &OrderId) -> Option<Decimal> {
        self.index.get(order_id).map(|slot| slot.remaining)
    }

    #[must_use]
    pub fn contains_order(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }

    /// Every resting order, in ID order.
    #[must_use]
    pub fn resting_order_ids(&self) -> Vec<OrderId> {
        self.index.keys().copied().collect()
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Recompute every aggregate from the index and compare.
    ///
    /// Only used on load and in tests; block processing never calls it.
    pub fn check_consistency(&self) -> Result<()> {
        let mut expected: BTreeMap<Decimal, DepthLevel> = BTreeMap::new();
        for (id, slot) in &self.index {
            if !self.queue(&slot.price, slot.side).is_some_and(|q| q.iter().any(|q_id| q_id == id)) {
                return Err(BlockmatchError::invariant(format!(
                    "order {id} indexed but not queued at {} {}",
                    slot.side, slot.price
                )));
            }
            *expected
                .entry(slot.price)
                .or_insert_with(|| DepthLevel::new(slot.price))
                .quantity_mut(slot.side) += slot.remaining;
        }
        let queued: usize = self.buys.values().chain(self.sells.values()).map(PriceLevel::len).sum();
        if queued != self.index.len() {
            return Err(BlockmatchError::invariant(format!(
                "{} queues hold {queued} orders, index holds {}",
                self.product,
                self.index.len()
            )));
        }
        let expected: Vec<DepthLevel> = expected.into_values().collect();
        if expected != self.snapshot() {
            return Err(BlockmatchError::invariant(format!(
                "{} depth aggregates disagree with resting orders",
                self.product
            )));
        }
        Ok(())
    }

    /// Drain the set of (price, side) queues touched since the last call.
    pub fn take_dirty_queues(&mut self) -> Vec<(Decimal, OrderSide)> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }
}

/// Queues and levels of one product that changed since the last flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDelta {
    pub product: Product,
    /// Full level list after the change (empty when the book is empty).
    pub levels: Vec<DepthLevel>,
    /// Touched queues with their current contents; empty means deleted.
    pub queues: Vec<(Decimal, OrderSide, Vec<OrderId>)>,
}

/// Depth books of every product, in symbol order.
#[derive(Debug, Clone, Default)]
pub struct DepthBook {
    books: BTreeMap<Product, ProductBook>,
    dirty: BTreeSet<Product>,
}

impl DepthBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_order(&mut self, order: &Order) -> Result<()> {
        self.books
            .entry(order.product.clone())
            .or_insert_with(|| ProductBook::new(order.product.clone()))
            .insert_order(order)?;
        self.dirty.insert(order.product.clone());
        Ok(())
    }

    pub fn reduce_order(
        &mut self,
        product: &Product,
        order_id: &OrderId,
        quantity: Decimal,
    ) -> Result<Decimal> {
        self.product_mut(product)
            .ok_or(BlockmatchError::DealOrderMissing(*order_id))?
            .reduce_order(order_id, quantity)
    }

    pub fn remove_order(&mut self, product: &Product, order_id: &OrderId) -> Result<Decimal> {
        self.product_mut(product)
            .ok_or(BlockmatchError::OrderNotFound(*order_id))?
            .remove_order(order_id)
    }

    #[must_use]
    pub fn product(&self, product: &Product) -> Option<&ProductBook> {
        self.books.get(product)
    }

    /// Mutable access; the product is flushed on the next [`take_deltas`](Self::take_deltas).
    pub fn product_mut(&mut self, product: &Product) -> Option<&mut ProductBook> {
        let book = self.books.get_mut(product)?;
        self.dirty.insert(product.clone());
        Some(book)
    }

    /// Products with at least one resting order, in symbol order.
    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.books
            .iter()
            .filter(|(_, book)| !book.is_empty())
            .map(|(product, _)| product.clone())
            .collect()
    }

    /// Levels of one product, ascending by price.
    #[must_use]
    pub fn snapshot(&self, product: &Product) -> Vec<DepthLevel> {
        self.books
            .get(product)
            .map(ProductBook::snapshot)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn contains_order(&self, product: &Product, order_id: &OrderId) -> bool {
        self.books
            .get(product)
            .is_some_and(|book| book.contains_order(order_id))
    }

    /// Everything that changed since the last call, product by product.
    /// Empty product books are dropped afterwards.
    pub fn take_deltas(&mut self) -> Vec<BookDelta> {
        let mut deltas = Vec::new();
        for product in std::mem::take(&mut self.dirty) {
            let Some(book) = self.books.get_mut(&product) else {
                continue;
            };
            let queues = book
                .take_dirty_queues()
                .into_iter()
                .map(|(price, side)| (price, side, book.order_ids(&price, side)))
                .collect();
            deltas.push(BookDelta {
                product: product.clone(),
                levels: book.snapshot(),
                queues,
            });
            if book.is_empty() {
                self.books.remove(&product);
            }
        }
        deltas
    }
}
