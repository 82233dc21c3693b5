//! Persisted product locks.

use std::collections::BTreeMap;

use blockmatch_types::{Product, ProductLock, Result};
use tracing::debug;

use crate::keys;
use crate::order_store::{OrderStore, decode};
use crate::store::StateStore;

impl<S: StateStore> OrderStore<S> {
    pub fn product_lock(&self, product: &Product) -> Result<Option<ProductLock>> {
        self.get_json(&keys::product_lock_key(product))
    }

    pub fn set_product_lock(&mut self, product: &Product, lock: &ProductLock) -> Result<()> {
        debug!(
            product = %product,
            price = %lock.price,
            quantity = %lock.quantity,
            buy_executed = %lock.buy_executed,
            sell_executed = %lock.sell_executed,
            "Product lock stored"
        );
        self.put_json(&keys::product_lock_key(product), lock)
    }

    pub fn delete_product_lock(&mut self, product: &Product) {
        debug!(product = %product, "Product lock removed");
        self.delete_key(&keys::product_lock_key(product));
    }

    /// Every locked product, sorted by symbol.
    pub fn locked_products(&self) -> Result<BTreeMap<Product, ProductLock>> {
        self.scan(&[keys::PRODUCT_LOCK_PREFIX])
            .into_iter()
            .map(|(key, value)| {
                let product = keys::parse_product_suffix(&key)?;
                let lock: ProductLock = decode(&key, &value)?;
                Ok((product, lock))
            })
            .collect()
    }
}
