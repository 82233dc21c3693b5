//! Per-block working state and the summary published at block end.

use std::collections::{BTreeMap, BTreeSet};

use blockmatch_settlement::{FeeSchedule, Settler};
use blockmatch_types::{
    BlockMatchResult, CloseReason, Closure, Denom, MatchResult, OrderId, Params, Product,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Everything one block accumulates between `begin_block` and `end_block`.
#[derive(Debug)]
pub struct BlockContext {
    pub height: u64,
    pub params: Params,
    pub(crate) settler: Settler,
    pub(crate) match_result: BlockMatchResult,
    closures: Vec<Closure>,
    updated: Vec<OrderId>,
    seen: BTreeSet<OrderId>,
}

impl BlockContext {
    #[must_use]
    pub fn new(height: u64, params: Params) -> Self {
        let settler = Settler::new(FeeSchedule::from_params(&params));
        Self {
            height,
            params,
            settler,
            match_result: BlockMatchResult::new(height),
            closures: Vec::new(),
            updated: Vec::new(),
            seen: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn fees(&self) -> &FeeSchedule {
        self.settler.fees()
    }

    /// Mark an order as changed this block. Only the first touch counts.
    pub fn touch(&mut self, order_id: OrderId) {
        if self.seen.insert(order_id) {
            self.updated.push(order_id);
        }
    }

    pub fn record_closure(&mut self, order_id: OrderId, reason: CloseReason) {
        self.touch(order_id);
        self.closures.push(Closure { order_id, reason });
    }

    pub fn record_match(&mut self, product: Product, result: MatchResult) {
        self.match_result.result_map.insert(product, result);
    }

    #[must_use]
    pub fn closures(&self) -> &[Closure] {
        &self.closures
    }

    #[must_use]
    pub fn closed_order_ids(&self) -> Vec<OrderId> {
        self.closures.iter().map(|c| c.order_id).collect()
    }

    #[must_use]
    pub fn updated_order_ids(&self) -> &[OrderId] {
        &self.updated
    }

    #[must_use]
    pub fn match_result(&self) -> &BlockMatchResult {
        &self.match_result
    }
}

/// What a finished block exposes to queries and event emitters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub height: u64,
    pub match_result: BlockMatchResult,
    /// In the order the closures happened.
    pub closed_order_ids: Vec<OrderId>,
    /// Orders touched by deals or closures, first touch first.
    pub updated_order_ids: Vec<OrderId>,
    /// Hex SHA-256 over the match result.
    pub deal_root: String,
    /// Trade and settlement fees collected, per denomination.
    pub fees_collected: BTreeMap<Denom, Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_touch_order_is_kept() {
        let mut ctx = BlockContext::new(10, Params::default());
        let (a, b) = (OrderId::new(10, 1), OrderId::new(10, 2));
        ctx.touch(b);
        ctx.touch(a);
        ctx.record_closure(b, CloseReason::Filled);
        ctx.record_closure(a, CloseReason::Expired);

        assert_eq!(ctx.updated_order_ids(), &[b, a]);
        assert_eq!(ctx.closed_order_ids(), vec![b, a]);
        assert_eq!(ctx.closures()[1].reason, CloseReason::Expired);
    }

    #[test]
    fn summary_survives_json() {
        let product = Product::new("btc", "usdt").unwrap();
        let mut match_result = BlockMatchResult::new(10);
        match_result.result_map.insert(
            product,
            MatchResult {
                block_height: 10,
                price: Decimal::TEN,
                quantity: Decimal::ONE,
                deals: Vec::new(),
            },
        );
        let summary = BlockSummary {
            height: 10,
            match_result,
            closed_order_ids: vec![OrderId::new(10, 1)],
            updated_order_ids: vec![OrderId::new(10, 1), OrderId::new(10, 2)],
            deal_root: "00".repeat(32),
            fees_collected: BTreeMap::from([("native".to_string(), Decimal::new(2592, 4))]),
        };
        let json = serde_json::to_string(&summary).unwrap();
        let back: BlockSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }
}
