//! Persisted depth levels and block bookkeeping.

use std::collections::BTreeSet;

use blockmatch_types::{DepthLevel, OrderId, Product, Result};

use crate::keys;
use crate::order_store::OrderStore;
use crate::store::StateStore;

impl<S: StateStore> OrderStore<S> {
    // =================================================================
    // Depth book
    // =================================================================

    /// Persisted depth levels of one product, ascending by price.
    pub fn depth_levels(&self, product: &Product) -> Result<Vec<DepthLevel>> {
        Ok(self
            .get_json(&keys::depth_book_key(product))?
            .unwrap_or_default())
    }

    /// Replace a product's persisted depth levels; no levels deletes the key.
    pub fn set_depth_levels(&mut self, product: &Product, levels: &[DepthLevel]) -> Result<()> {
        let key = keys::depth_book_key(product);
        if levels.is_empty() {
            self.delete_key(&key);
            Ok(())
        } else {
            self.put_json(&key, levels)
        }
    }

    /// Products that have persisted depth levels.
    pub fn depth_products(&self) -> Result<BTreeSet<Product>> {
        self.scan(&[keys::DEPTH_BOOK_PREFIX])
            .into_iter()
            .map(|(key, _)| keys::parse_product_suffix(&key))
            .collect()
    }

    // =================================================================
    // Block bookkeeping
    // =================================================================

    /// Orders closed in the last finished block, awaiting purge.
    pub fn last_closed_order_ids(&self) -> Result<Vec<OrderId>> {
        Ok(self
            .get_json(keys::LAST_CLOSED_ORDER_IDS_KEY)?
            .unwrap_or_default())
    }

    pub fn set_last_closed_order_ids(&mut self, ids: &[OrderId]) -> Result<()> {
        self.put_json(keys::LAST_CLOSED_ORDER_IDS_KEY, ids)
    }

    /// Watermark of the expiry scan; `0` before the first scan.
    pub fn last_expired_block_height(&self) -> Result<u64> {
        Ok(self
            .get_json(keys::LAST_EXPIRED_HEIGHT_KEY)?
            .unwrap_or(0))
    }

    pub fn set_last_expired_block_height(&mut self, height: u64) -> Result<()> {
        self.put_json(keys::LAST_EXPIRED_HEIGHT_KEY, &height)
    }

    /// Height of the last block that finished `end_block`; `0` if none.
    pub fn last_block_height(&self) -> Result<u64> {
        Ok(self.get_json(keys::LAST_BLOCK_HEIGHT_KEY)?.unwrap_or(0))
    }

    pub fn set_last_block_height(&mut self, height: u64) -> Result<()> {
        self.put_json(keys::LAST_BLOCK_HEIGHT_KEY, &height)
    }
}
