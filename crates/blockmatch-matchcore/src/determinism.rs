//! Determinism verification utilities for cross-node consistency.
//!
//! Every node replaying the same block must produce the exact same
//! [`BlockMatchResult`]. The deal root is a SHA-256 digest over every
//! product's result that enables quick comparison without shipping full
//! payloads.

use blockmatch_types::BlockMatchResult;
use sha2::{Digest, Sha256};

/// Compute the deal root of a block's match result.
///
/// Depends on, in order:
/// - the block height
/// - each product symbol (sorted) with its recorded height, price and quantity
/// - each deal's order ID, side, quantity and price, in execution order
///
/// Decimals are hashed in normalized form, so `10.0` and `10` agree.
#[must_use]
pub fn compute_deal_root(result: &BlockMatchResult) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"blockmatch:deal_root:v1:");
    hasher.update(result.block_height.to_le_bytes());
    hasher.update((result.result_map.len() as u64).to_le_bytes());

    for (product, entry) in &result.result_map {
        hasher.update(product.symbol().as_bytes());
        hasher.update([0u8]);
        hasher.update(entry.block_height.to_le_bytes());
        hasher.update(entry.price.normalize().to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(entry.quantity.normalize().to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update((entry.deals.len() as u64).to_le_bytes());

        for deal in &entry.deals {
            hasher.update(deal.order_id.to_string().as_bytes());
            hasher.update([0u8]);
            hasher.update(deal.side.to_string().as_bytes());
            hasher.update([0u8]);
            hasher.update(deal.quantity.normalize().to_string().as_bytes());
            hasher.update([0u8]);
            hasher.update(deal.price.normalize().to_string().as_bytes());
            hasher.update([0u8]);
        }
    }

    let digest = hasher.finalize();
    let mut root = [0u8; 32];
    root.copy_from_slice(&digest);
    root
}

/// Verify that a block's match result hashes to `expected_root`.
#[must_use]
pub fn verify_deal_root(result: &BlockMatchResult, expected_root: &[u8; 32]) -> bool {
    compute_deal_root(result) == *expected_root
}

/// Hex form of a deal root, as published in block summaries and logs.
#[must_use]
pub fn deal_root_hex(root: &[u8; 32]) -> String {
    hex::encode(root)
}

#[cfg(test)]
mod tests {
    use blockmatch_types::{Deal, MatchResult, OrderId, OrderSide, Product};
    use rust_decimal::Decimal;

    use super::*;

    fn deal(ordinal: u64, side: OrderSide) -> Deal {
        Deal {
            order_id: OrderId::new(10, ordinal),
            side,
            quantity: Decimal::new(5, 1),
            price: Decimal::new(100, 1),
        }
    }

    fn block(deals: Vec<Deal>) -> BlockMatchResult {
        let mut result = BlockMatchResult::new(10);
        result.result_map.insert(
            "btc_usdt".parse::<Product>().unwrap(),
            MatchResult {
                block_height: 10,
                price: Decimal::new(100, 1),
                quantity: Decimal::new(5, 1),
                deals,
            },
        );
        result
    }

    #[test]
    fn empty_result_deterministic() {
        let a = compute_deal_root(&BlockMatchResult::new(10));
        let b = compute_deal_root(&BlockMatchResult::new(10));
        assert_eq!(a, b);
        assert_ne!(a, compute_deal_root(&BlockMatchResult::new(11)));
    }

    #[test]
    fn order_matters() {
        let ab = block(vec![deal(1, OrderSide::Buy), deal(2, OrderSide::Sell)]);
        let ba = block(vec![deal(2, OrderSide::Sell), deal(1, OrderSide::Buy)]);
        assert_ne!(
            compute_deal_root(&ab),
            compute_deal_root(&ba),
            "order of deals must affect the root"
        );
    }

    #[test]
    fn decimal_scale_does_not_matter() {
        let mut scaled = block(vec![deal(1, OrderSide::Buy)]);
        let plain = scaled.clone();
        for entry in scaled.result_map.values_mut() {
            entry.price = "10.000".parse().unwrap();
        }
        assert_eq!(compute_deal_root(&scaled), compute_deal_root(&plain));
    }

    #[test]
    fn verify_roundtrip_and_hex() {
        let result = block(vec![deal(1, OrderSide::Buy)]);
        let root = compute_deal_root(&result);
        assert!(verify_deal_root(&result, &root));
        assert!(!verify_deal_root(&result, &[0xAB; 32]));
        assert_eq!(deal_root_hex(&root).len(), 64);
    }
}
