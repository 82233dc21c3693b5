//! Which products may trade.
//!
//! The engine never owns the list of products; the host decides. A product
//! that was once listed and has since been withdrawn is *delisted*: its
//! resting orders are closed at the next block end without a settlement fee.

use std::collections::BTreeMap;

use blockmatch_types::Product;

/// Listing state of a product as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Listed,
    Delisted,
    Unknown,
}

/// Source of truth for listed products.
pub trait ProductRegistry {
    fn listing(&self, product: &Product) -> Listing;

    fn is_listed(&self, product: &Product) -> bool {
        self.listing(product) == Listing::Listed
    }
}

/// In-memory registry.
#[derive(Debug, Clone, Default)]
pub struct ListedProducts {
    products: BTreeMap<Product, bool>,
}

impl ListedProducts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every product listed.
    pub fn with(products: impl IntoIterator<Item = Product>) -> Self {
        let mut registry = Self::new();
        for product in products {
            registry.list(product);
        }
        registry
    }

    pub fn list(&mut self, product: Product) {
        self.products.insert(product, true);
    }

    /// Withdraw a product. Returns `false` if it was never listed.
    pub fn delist(&mut self, product: &Product) -> bool {
        match self.products.get_mut(product) {
            Some(listed) => {
                *listed = false;
                true
            }
            None => false,
        }
    }

    /// Listed products in symbol order.
    pub fn listed(&self) -> impl Iterator<Item = &Product> {
        self.products
            .iter()
            .filter(|(_, listed)| **listed)
            .map(|(product, _)| product)
    }
}

impl ProductRegistry for ListedProducts {
    fn listing(&self, product: &Product) -> Listing {
        match self.products.get(product) {
            Some(true) => Listing::Listed,
            Some(false) => Listing::Delisted,
            None => Listing::Unknown,
        }
    }
}
