//! Order expiry with a watermark.
//!
//! An order created at height `h` expires at the first block end whose
//! height `H` satisfies `H - E >= h` (with `E = order_expire_blocks`).
//! Each block scans creation heights from where the previous scan left
//! off up to `H - E`:
//!
//! ```text
//! start = max(1, last_expired - E + 1)      (H - E on a fresh store)
//! end   = H - E
//! ```
//!
//! Orders of a locked product are deferred. When a height is deferred the
//! watermark stops just below it (`h0 + E - 1`), so the next block rescans
//! it; otherwise the watermark moves to `H`. A height whose orders are all
//! gone has its order counter dropped.

use std::collections::BTreeMap;

use blockmatch_matchcore::DepthBook;
use blockmatch_store::{OrderStore, StateStore};
use blockmatch_types::{CloseReason, Product, ProductLock, Result};
use tracing::{debug, warn};

use crate::context::BlockContext;

/// Close every expired open order of an unlocked product.
pub(crate) fn expire_orders<S: StateStore>(
    store: &mut OrderStore<S>,
    book: &mut DepthBook,
    ctx: &mut BlockContext,
) -> Result<()> {
    let height = ctx.height;
    let expire_blocks = ctx.params.order_expire_blocks;
    let Some(end) = height.checked_sub(expire_blocks).filter(|end| *end > 0) else {
        store.set_last_expired_block_height(height)?;
        return Ok(());
    };

    let last = store.last_expired_block_height()?;
    let start = if last == 0 {
        end
    } else {
        (last.saturating_sub(expire_blocks) + 1).max(1)
    };
    let locked = store.locked_products()?;

    let mut first_deferred = None;
    for creation_height in start..=end {
        if store.block_order_num(creation_height)? == 0 {
            continue;
        }
        if expire_height(store, book, ctx, &locked, creation_height)? {
            warn!(height, creation_height, "Expiry deferred, product locked");
            first_deferred.get_or_insert(creation_height);
        } else {
            store.drop_block_order_num(creation_height);
        }
    }

    let watermark = match first_deferred {
        Some(deferred) => deferred + expire_blocks - 1,
        None => height,
    };
    store.set_last_expired_block_height(watermark)?;
    debug!(height, start, end, watermark, "Expiry scan");
    Ok(())
}

/// Expire the open orders created at one height. Returns `true` if any
/// were deferred because their product is locked.
fn expire_height<S: StateStore>(
    store: &mut OrderStore<S>,
    book: &mut DepthBook,
    ctx: &mut BlockContext,
    locked: &BTreeMap<Product, ProductLock>,
    creation_height: u64,
) -> Result<bool> {
    let mut deferred = false;
    for mut order in store.orders_at_height(creation_height)? {
        if !order.is_open() {
            continue;
        }
        if locked.contains_key(&order.product) {
            deferred = true;
            continue;
        }
        book.remove_order(&order.product, &order.id)?;
        let status = order.close(CloseReason::Expired)?;
        store.set_order(&order)?;
        ctx.record_closure(order.id, CloseReason::Expired);
        debug!(order_id = %order.id, status = %status, "Order expired");
    }
    Ok(deferred)
}
