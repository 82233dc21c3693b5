//! Per-product matching at block end.
//!
//! Products are visited in symbol order. A locked product resumes its
//! interrupted level; any other product with a crossed book runs a fresh
//! auction. Deals are written back to the stored orders immediately; funds
//! move later, in the settlement step.

use std::collections::BTreeSet;

use blockmatch_matchcore::{DepthBook, LockTransition, MatchOutcome, resume_locked, run_auction};
use blockmatch_store::{OrderStore, StateStore};
use blockmatch_types::{BlockmatchError, CloseReason, Product, Result};
use tracing::info;

use crate::context::BlockContext;

pub(crate) fn match_products<S: StateStore>(
    store: &mut OrderStore<S>,
    book: &mut DepthBook,
    ctx: &mut BlockContext,
) -> Result<()> {
    let locks = store.locked_products()?;
    let products: BTreeSet<Product> = book
        .products()
        .into_iter()
        .chain(locks.keys().cloned())
        .collect();
    let max_deals = ctx.params.max_deals_per_block;

    for product in products {
        let outcome = if let Some(lock) = locks.get(&product) {
            let Some(product_book) = book.product_mut(&product) else {
                if lock.is_settled() {
                    store.delete_product_lock(&product);
                    continue;
                }
                return Err(BlockmatchError::invariant(format!(
                    "{product} locked at {} with an empty book",
                    lock.price
                )));
            };
            info!(
                product = %product,
                lock_height = lock.block_height,
                price = %lock.price,
                "Resuming locked settlement"
            );
            resume_locked(product_book, lock.clone(), max_deals)?
        } else {
            let crossed = book
                .product(&product)
                .is_some_and(|b| !b.matching_prices().is_empty());
            if !crossed {
                continue;
            }
            let Some(product_book) = book.product_mut(&product) else {
                continue;
            };
            run_auction(product_book, ctx.height, max_deals)?
        };
        apply_outcome(store, ctx, &product, outcome)?;
    }
    Ok(())
}

/// Write deals into the stored orders and persist the lock transition.
fn apply_outcome<S: StateStore>(
    store: &mut OrderStore<S>,
    ctx: &mut BlockContext,
    product: &Product,
    outcome: MatchOutcome,
) -> Result<()> {
    for deal in outcome.deals() {
        let mut order = store
            .get_order(&deal.order_id)?
            .ok_or(BlockmatchError::DealOrderMissing(deal.order_id))?;
        order.fill(deal.quantity)?;
        store.set_order(&order)?;
        ctx.touch(order.id);
        if order.is_filled() {
            ctx.record_closure(order.id, CloseReason::Filled);
        }
    }

    match outcome.lock {
        LockTransition::None => {}
        LockTransition::Set(lock) => {
            info!(
                product = %product,
                price = %lock.price,
                buy_executed = %lock.buy_executed,
                sell_executed = %lock.sell_executed,
                quantity = %lock.quantity,
                "Deal budget spent, product locked"
            );
            store.set_product_lock(product, &lock)?;
        }
        LockTransition::Released => {
            info!(product = %product, "Locked settlement complete, product unlocked");
            store.delete_product_lock(product);
        }
    }

    if let Some(result) = outcome.result {
        info!(
            product = %product,
            price = %result.price,
            quantity = %result.quantity,
            deals = result.deals.len(),
            "Matched"
        );
        ctx.record_match(product.clone(), result);
    }
    Ok(())
}
