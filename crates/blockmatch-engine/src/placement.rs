//! Order entry and cancellation during a block.

use blockmatch_matchcore::DepthBook;
use blockmatch_settlement::{Ledger, placement_reservation};
use blockmatch_store::{OrderStore, StateStore};
use blockmatch_types::{
    AccountId, BlockmatchError, CloseReason, Coin, NewOrder, Order, OrderId, Result,
};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::context::BlockContext;
use crate::registry::{Listing, ProductRegistry};

pub(crate) fn validate<R: ProductRegistry>(new: &NewOrder, registry: &R) -> Result<()> {
    if new.price <= Decimal::ZERO {
        return Err(BlockmatchError::InvalidOrder {
            reason: format!("price {} must be positive", new.price),
        });
    }
    if new.quantity <= Decimal::ZERO {
        return Err(BlockmatchError::InvalidOrder {
            reason: format!("quantity {} must be positive", new.quantity),
        });
    }
    // Every deal amount of the order is bounded by price × quantity.
    if new.price.checked_mul(new.quantity).is_none() {
        return Err(BlockmatchError::InvalidOrder {
            reason: format!("price {} × quantity {} is out of range", new.price, new.quantity),
        });
    }
    match registry.listing(&new.product) {
        Listing::Listed => Ok(()),
        Listing::Delisted => Err(BlockmatchError::ProductDelisted(new.product.clone())),
        Listing::Unknown => Err(BlockmatchError::UnknownProduct(new.product.clone())),
    }
}

/// Validate, reserve funds, then index and store the order.
///
/// The order carries the settlement fee in force now. A failure after the
/// reservation undoes every earlier step, so a rejected placement leaves
/// funds, book and store as they were.
pub(crate) fn place_order<S: StateStore, L: Ledger, R: ProductRegistry>(
    store: &mut OrderStore<S>,
    book: &mut DepthBook,
    ledger: &mut L,
    registry: &R,
    ctx: &BlockContext,
    new: NewOrder,
) -> Result<OrderId> {
    validate(&new, registry)?;

    let provisional = OrderId::new(ctx.height, store.block_order_num(ctx.height)? + 1);
    let order = Order::from_new(provisional, new, ctx.params.order_expire_blocks)
        .with_settlement_fee(&ctx.fees().settlement_fee);
    let reservation = placement_reservation(&order)?;
    ledger.lock_funds(&order.sender, &reservation)?;

    if let Err(err) = book.insert_order(&order) {
        release(ledger, &order.sender, &reservation)?;
        return Err(err);
    }
    if let Err(err) = persist(store, &order) {
        store.delete_order(&order.id);
        book.remove_order(&order.product, &order.id)?;
        release(ledger, &order.sender, &reservation)?;
        return Err(err);
    }

    info!(
        order_id = %order.id,
        product = %order.product,
        side = %order.side,
        price = %order.price,
        quantity = %order.quantity,
        "Order placed"
    );
    Ok(order.id)
}

/// Write the order, then advance the height's counter past it.
fn persist<S: StateStore>(store: &mut OrderStore<S>, order: &Order) -> Result<()> {
    store.set_order(order)?;
    let id = store.next_order_id(order.creation_height)?;
    if id != order.id {
        return Err(BlockmatchError::invariant(format!(
            "order counter moved from {} to {id} during placement",
            order.id
        )));
    }
    Ok(())
}

fn release<L: Ledger>(ledger: &mut L, sender: &AccountId, reservation: &[Coin]) -> Result<()> {
    for coin in reservation {
        ledger.release_funds(sender, coin)?;
    }
    Ok(())
}

/// Close an open order at its owner's request.
///
/// The reservation is released when the block settles.
pub(crate) fn cancel_order<S: StateStore>(
    store: &mut OrderStore<S>,
    book: &mut DepthBook,
    ctx: &mut BlockContext,
    sender: &AccountId,
    order_id: &OrderId,
) -> Result<()> {
    let mut order = store.must_get_order(order_id)?;
    if order.sender != *sender {
        return Err(BlockmatchError::Unauthorized(*order_id));
    }
    if !order.is_open() {
        return Err(BlockmatchError::OrderNotCancellable {
            id: *order_id,
            status: order.status,
        });
    }
    if store.product_lock(&order.product)?.is_some() {
        return Err(BlockmatchError::ProductBusy(order.product.clone()));
    }

    book.remove_order(&order.product, order_id)?;
    let status = order.close(CloseReason::Cancelled)?;
    store.set_order(&order)?;
    ctx.record_closure(*order_id, CloseReason::Cancelled);

    debug!(order_id = %order_id, status = %status, "Order cancelled");
    Ok(())
}
