//! Closed orders stay readable for exactly one block.
//!
//! A block's closed IDs are persisted when it ends; the next block deletes
//! those records before doing anything else.

use blockmatch_matchcore::DepthBook;
use blockmatch_store::{OrderStore, StateStore};
use blockmatch_types::Result;
use tracing::{debug, warn};

/// Delete the records of orders closed in the previous block.
pub(crate) fn purge_closed_orders<S: StateStore>(
    store: &mut OrderStore<S>,
    book: &mut DepthBook,
) -> Result<usize> {
    let ids = store.last_closed_order_ids()?;
    for id in &ids {
        if let Some(order) = store.get_order(id)? {
            if book.contains_order(&order.product, id) {
                warn!(order_id = %id, "Closed order still indexed, removing");
                book.remove_order(&order.product, id)?;
            }
        }
        store.delete_order(id);
    }
    store.set_last_closed_order_ids(&[])?;
    if !ids.is_empty() {
        debug!(count = ids.len(), "Purged closed orders");
    }
    Ok(ids.len())
}
