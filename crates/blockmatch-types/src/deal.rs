//! Deals and per-block match results.
//!
//! A [`Deal`] is the immutable record of one order's execution inside one
//! price-level match. The deals of a product in one block, in execution
//! order, make up that product's [`MatchResult`].

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OrderId, OrderSide, Product};

/// One order's execution within a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    pub order_id: OrderId,
    pub side: OrderSide,
    /// Executed quantity in the base denomination.
    pub quantity: Decimal,
    /// Execution price (the matched price level).
    pub price: Decimal,
}

impl std::fmt::Display for Deal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Deal[{}] {} {} @ {}",
            self.order_id, self.side, self.quantity, self.price
        )
    }
}

/// A product's contribution to a block's match result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Height the auction started at. Stays pinned while a busy-market
    /// settlement is carried across blocks.
    pub block_height: u64,
    /// Last matched price level.
    pub price: Decimal,
    /// Trade quantity negotiated at `price`.
    pub quantity: Decimal,
    /// Deals executed this block, in execution order.
    pub deals: Vec<Deal>,
}

impl MatchResult {
    /// Total executed quantity on one side.
    #[must_use]
    pub fn executed(&self, side: OrderSide) -> Decimal {
        self.deals
            .iter()
            .filter(|d| d.side == side)
            .map(|d| d.quantity)
            .sum()
    }
}

/// All products' match results for one block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMatchResult {
    pub block_height: u64,
    /// Sorted by product symbol.
    pub result_map: BTreeMap<Product, MatchResult>,
}

impl BlockMatchResult {
    #[must_use]
    pub fn new(block_height: u64) -> Self {
        Self {
            block_height,
            result_map: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, product: &Product) -> Option<&MatchResult> {
        self.result_map.get(product)
    }

    /// All deals of the block, product by product.
    pub fn deals(&self) -> impl Iterator<Item = (&Product, &Deal)> {
        self.result_map
            .iter()
            .flat_map(|(product, result)| result.deals.iter().map(move |d| (product, d)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.result_map.is_empty()
    }
}
