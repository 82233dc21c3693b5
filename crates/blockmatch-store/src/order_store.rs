//! Durable order records and their secondary indices.
//!
//! - orders keyed by their formatted ID, so a key-prefix scan over
//!   `ID{height}-` lists every order of one block (the expiry index)
//! - a per-height counter that hands out ordinals for new order IDs
//! - per (product, price, side) FIFO queues of order IDs

use blockmatch_types::{BlockmatchError, Order, OrderId, OrderSide, Product, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::keys;
use crate::store::StateStore;

/// Typed access to everything the engine persists.
///
/// Owns the underlying [`StateStore`]. Other record families (locks,
/// depth levels, block bookkeeping) live in sibling modules as further
/// `impl` blocks.
#[derive(Debug)]
pub struct OrderStore<S> {
    store: S,
}

impl<S: StateStore> OrderStore<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.store
    }

    #[must_use]
    pub fn into_inner(self) -> S {
        self.store
    }

    // =================================================================
    // Orders
    // =================================================================

    pub fn get_order(&self, id: &OrderId) -> Result<Option<Order>> {
        self.get_json(&keys::order_key(id))
    }

    /// Like [`get_order`](Self::get_order), but a missing order is an error.
    pub fn must_get_order(&self, id: &OrderId) -> Result<Order> {
        self.get_order(id)?
            .ok_or(BlockmatchError::OrderNotFound(*id))
    }

    pub fn set_order(&mut self, order: &Order) -> Result<()> {
        self.put_json(&keys::order_key(&order.id), order)
    }

    pub fn delete_order(&mut self, id: &OrderId) {
        self.store.delete(&keys::order_key(id));
    }

    /// Every stored order created at `height`, in ordinal order.
    pub fn orders_at_height(&self, height: u64) -> Result<Vec<Order>> {
        let mut orders = self
            .store
            .prefix_scan(&keys::orders_at_height_prefix(height))
            .into_iter()
            .map(|(key, value)| decode::<Order>(&key, &value))
            .collect::<Result<Vec<_>>>()?;
        // Keys sort lexically ("-10" before "-2"); IDs sort by ordinal.
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    // =================================================================
    // Per-height order counter
    // =================================================================

    /// Orders placed at `height` that the counter still remembers.
    pub fn block_order_num(&self, height: u64) -> Result<u64> {
        Ok(self
            .get_json(&keys::block_order_num_key(height))?
            .unwrap_or(0))
    }

    /// Reserve the next order ID for a block.
    pub fn next_order_id(&mut self, height: u64) -> Result<OrderId> {
        let ordinal = self.block_order_num(height)? + 1;
        self.put_json(&keys::block_order_num_key(height), &ordinal)?;
        Ok(OrderId::new(height, ordinal))
    }

    pub fn drop_block_order_num(&mut self, height: u64) {
        self.store.delete(&keys::block_order_num_key(height));
    }

    // =================================================================
    // Price-level queues
    // =================================================================

    pub fn price_level_order_ids(
        &self,
        product: &Product,
        price: &Decimal,
        side: OrderSide,
    ) -> Result<Vec<OrderId>> {
        Ok(self
            .get_json(&keys::price_level_key(product, price, side))?
            .unwrap_or_default())
    }

    /// Replace a queue; an empty queue deletes the key.
    pub fn set_price_level_order_ids(
        &mut self,
        product: &Product,
        price: &Decimal,
        side: OrderSide,
        ids: &[OrderId],
    ) -> Result<()> {
        let key = keys::price_level_key(product, price, side);
        if ids.is_empty() {
            self.store.delete(&key);
            Ok(())
        } else {
            self.put_json(&key, &ids)
        }
    }

    /// Every persisted queue of one product.
    pub fn product_price_levels(
        &self,
        product: &Product,
    ) -> Result<Vec<(Decimal, OrderSide, Vec<OrderId>)>> {
        self.scan_price_levels(&keys::price_level_product_prefix(product))
            .map(|levels| {
                levels
                    .into_iter()
                    .map(|(_, price, side, ids)| (price, side, ids))
                    .collect()
            })
    }

    /// Every persisted queue of every product.
    pub fn all_price_levels(&self) -> Result<Vec<(Product, Decimal, OrderSide, Vec<OrderId>)>> {
        self.scan_price_levels(&[keys::PRICE_LEVEL_PREFIX])
    }

    fn scan_price_levels(
        &self,
        prefix: &[u8],
    ) -> Result<Vec<(Product, Decimal, OrderSide, Vec<OrderId>)>> {
        self.store
            .prefix_scan(prefix)
            .into_iter()
            .map(|(key, value)| {
                let (product, side, price) = keys::parse_price_level_key(&key)?;
                let ids: Vec<OrderId> = decode(&key, &value)?;
                Ok((product, price, side, ids))
            })
            .collect()
    }

    // =================================================================
    // Encoding
    // =================================================================

    /// Read and decode a JSON record.
    pub fn get_json<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        self.store
            .get(key)
            .map(|value| decode(key, &value))
            .transpose()
    }

    /// Encode and write a JSON record.
    pub fn put_json<T: Serialize + ?Sized>(&mut self, key: &[u8], value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.store.set(key, bytes);
        Ok(())
    }

    pub(crate) fn delete_key(&mut self, key: &[u8]) {
        self.store.delete(key);
    }

    pub(crate) fn scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.store.prefix_scan(prefix)
    }
}

pub(crate) fn decode<T: DeserializeOwned>(key: &[u8], value: &[u8]) -> Result<T> {
    serde_json::from_slice(value).map_err(|e| BlockmatchError::CorruptState {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: e.to_string(),
    })
}
