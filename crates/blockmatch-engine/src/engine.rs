//! The block state machine.
//!
//! ```text
//! begin_block(height, params)
//!   place_order / cancel_order        (any number, any order)
//! end_block()
//!   1. purge orders closed last block
//!   2. close resting orders of delisted products
//!   3. expire orders (watermark scan)
//!   4. match each product (resume lock or fresh auction)
//!   5. settle deals, then closures
//!   6. flush touched depth levels and queues to the store
//!   7. persist bookkeeping and publish the block summary
//! ```
//!
//! An error out of `end_block` means the block transition failed; the host
//! is expected to discard the store writes of that block. The in-memory
//! book and ledger may already be half-way through the block, so the engine
//! refuses every further state change until it is reopened from the
//! committed store with [`Engine::open`].

use std::collections::BTreeSet;

use blockmatch_matchcore::{DepthBook, ProductBook, compute_deal_root, deal_root_hex};
use blockmatch_settlement::Ledger;
use blockmatch_store::{OrderStore, StateStore, keys};
use blockmatch_types::constants::{ENGINE_NAME, VERSION};
use blockmatch_types::{
    AccountId, BlockMatchResult, BlockmatchError, CloseReason, DepthLevel, NewOrder, Order,
    OrderId, OrderSide, Params, Product, ProductLock, Result,
};
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};

use crate::context::{BlockContext, BlockSummary};
use crate::registry::ProductRegistry;
use crate::{auction, expiry, placement, tracker};

/// Periodic matching engine over a host-provided store, ledger and
/// product registry.
#[derive(Debug)]
pub struct Engine<S, L, R> {
    store: OrderStore<S>,
    book: DepthBook,
    ledger: L,
    registry: R,
    block: Option<BlockContext>,
    published: Option<BlockSummary>,
    /// Height of a block whose `end_block` failed.
    failed_height: Option<u64>,
}

impl<S: StateStore, L: Ledger, R: ProductRegistry> Engine<S, L, R> {
    /// Load an engine from `store`, rebuilding the in-memory depth book
    /// from the persisted queues.
    ///
    /// # Errors
    /// `CorruptState` if a queue references a missing or closed order, or
    /// the rebuilt levels disagree with the persisted ones.
    pub fn open(store: S, ledger: L, registry: R) -> Result<Self> {
        let store = OrderStore::new(store);
        let book = rebuild_book(&store)?;
        let published: Option<BlockSummary> = store.get_json(keys::LAST_BLOCK_SUMMARY_KEY)?;
        info!(
            engine = ENGINE_NAME,
            version = VERSION,
            products = book.products().len(),
            last_height = store.last_block_height()?,
            "Engine opened"
        );
        Ok(Self {
            store,
            book,
            ledger,
            registry,
            block: None,
            published,
            failed_height: None,
        })
    }

    // =================================================================
    // Block lifecycle
    // =================================================================

    /// Start a block. Clears the previously published summary.
    pub fn begin_block(&mut self, height: u64, params: Params) -> Result<()> {
        self.ensure_usable()?;
        if let Some(ctx) = &self.block {
            return Err(BlockmatchError::BlockInProgress(ctx.height));
        }
        params.validate()?;
        let last = self.store.last_block_height()?;
        if height <= last {
            return Err(BlockmatchError::HeightNotAdvancing {
                requested: height,
                last,
            });
        }
        self.block = Some(BlockContext::new(height, params));
        self.published = None;
        debug!(height, "Block started");
        Ok(())
    }

    /// Reserve funds and rest a new order on the book.
    pub fn place_order(&mut self, new: NewOrder) -> Result<OrderId> {
        self.ensure_usable()?;
        let ctx = self
            .block
            .as_ref()
            .ok_or(BlockmatchError::NoBlockInProgress)?;
        placement::place_order(
            &mut self.store,
            &mut self.book,
            &mut self.ledger,
            &self.registry,
            ctx,
            new,
        )
    }

    /// Cancel an open order of `sender`.
    ///
    /// # Errors
    /// `ProductBusy` while the product is locked.
    pub fn cancel_order(&mut self, sender: &AccountId, order_id: &OrderId) -> Result<()> {
        self.ensure_usable()?;
        let ctx = self
            .block
            .as_mut()
            .ok_or(BlockmatchError::NoBlockInProgress)?;
        placement::cancel_order(&mut self.store, &mut self.book, ctx, sender, order_id)
    }

    /// Run the block-end pipeline and publish its summary.
    ///
    /// # Errors
    /// Any pipeline error. The engine is unusable afterwards until it is
    /// reopened.
    pub fn end_block(&mut self) -> Result<BlockSummary> {
        self.ensure_usable()?;
        let ctx = self
            .block
            .take()
            .ok_or(BlockmatchError::NoBlockInProgress)?;
        let height = ctx.height;
        match self.finish_block(ctx) {
            Ok(summary) => {
                self.published = Some(summary.clone());
                Ok(summary)
            }
            Err(e) => {
                error!(height, fatal = e.is_fatal(), error = %e, "Block processing failed");
                self.failed_height = Some(height);
                Err(e)
            }
        }
    }

    fn ensure_usable(&self) -> Result<()> {
        match self.failed_height {
            Some(height) => Err(BlockmatchError::CorruptState {
                key: "engine".to_string(),
                reason: format!("block {height} failed; reopen from the committed store"),
            }),
            None => Ok(()),
        }
    }

    fn finish_block(&mut self, mut ctx: BlockContext) -> Result<BlockSummary> {
        tracker::purge_closed_orders(&mut self.store, &mut self.book)?;
        self.close_delisted(&mut ctx)?;
        expiry::expire_orders(&mut self.store, &mut self.book, &mut ctx)?;
        auction::match_products(&mut self.store, &mut self.book, &mut ctx)?;
        self.settle(&mut ctx)?;
        self.flush_book()?;
        self.publish(ctx)
    }

    fn close_delisted(&mut self, ctx: &mut BlockContext) -> Result<()> {
        for product in self.book.products() {
            if self.registry.is_listed(&product) {
                continue;
            }
            let ids = self
                .book
                .product(&product)
                .map(ProductBook::resting_order_ids)
                .unwrap_or_default();
            warn!(product = %product, orders = ids.len(), "Product delisted, closing resting orders");
            for id in ids {
                let mut order = self.store.get_order(&id)?.ok_or_else(|| {
                    BlockmatchError::invariant(format!("indexed order {id} has no record"))
                })?;
                self.book.remove_order(&product, &id)?;
                order.close(CloseReason::Delisted)?;
                self.store.set_order(&order)?;
                ctx.record_closure(id, CloseReason::Delisted);
            }
        }
        for product in self.store.locked_products()?.into_keys() {
            if !self.registry.is_listed(&product) {
                self.store.delete_product_lock(&product);
                info!(product = %product, "Lock of delisted product dropped");
            }
        }
        Ok(())
    }

    /// Deals in product then execution order, then closures in the order
    /// they happened.
    fn settle(&mut self, ctx: &mut BlockContext) -> Result<()> {
        for result in ctx.match_result.result_map.values() {
            for deal in &result.deals {
                let order = self
                    .store
                    .get_order(&deal.order_id)?
                    .ok_or(BlockmatchError::DealOrderMissing(deal.order_id))?;
                ctx.settler.settle_deal(&mut self.ledger, &order, deal)?;
            }
        }
        for closure in ctx.closures().to_vec() {
            let order = self.store.must_get_order(&closure.order_id)?;
            ctx.settler
                .settle_closure(&mut self.ledger, &order, closure.reason)?;
        }
        Ok(())
    }

    fn flush_book(&mut self) -> Result<()> {
        for delta in self.book.take_deltas() {
            self.store.set_depth_levels(&delta.product, &delta.levels)?;
            for (price, side, ids) in &delta.queues {
                self.store
                    .set_price_level_order_ids(&delta.product, price, *side, ids)?;
            }
        }
        Ok(())
    }

    fn publish(&mut self, mut ctx: BlockContext) -> Result<BlockSummary> {
        let closed_order_ids = ctx.closed_order_ids();
        self.store.set_last_closed_order_ids(&closed_order_ids)?;
        self.store.set_last_block_height(ctx.height)?;

        let deal_root = deal_root_hex(&compute_deal_root(&ctx.match_result));
        let summary = BlockSummary {
            height: ctx.height,
            closed_order_ids,
            updated_order_ids: ctx.updated_order_ids().to_vec(),
            deal_root,
            fees_collected: ctx.settler.take_collected(),
            match_result: ctx.match_result,
        };
        self.store.put_json(keys::LAST_BLOCK_SUMMARY_KEY, &summary)?;

        info!(
            height = summary.height,
            products = summary.match_result.result_map.len(),
            deals = summary.match_result.deals().count(),
            closed = summary.closed_order_ids.len(),
            deal_root = %summary.deal_root,
            "Block ended"
        );
        Ok(summary)
    }

    // =================================================================
    // Operator hooks
    // =================================================================

    /// Release a product lock without finishing its settlement.
    /// Returns `false` if the product was not locked.
    pub fn unlock_product(&mut self, product: &Product) -> Result<bool> {
        self.ensure_usable()?;
        if self.store.product_lock(product)?.is_none() {
            return Ok(false);
        }
        self.store.delete_product_lock(product);
        info!(product = %product, "Product unlocked by operator");
        Ok(true)
    }

    /// Install a lock record directly, e.g. when replaying state.
    pub fn set_product_lock(&mut self, product: &Product, lock: &ProductLock) -> Result<()> {
        self.ensure_usable()?;
        self.store.set_product_lock(product, lock)
    }

    // =================================================================
    // Queries
    // =================================================================

    #[must_use]
    pub fn current_height(&self) -> Option<u64> {
        self.block.as_ref().map(|ctx| ctx.height)
    }

    pub fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.store.get_order(order_id)
    }

    /// Live levels of one product, ascending by price.
    #[must_use]
    pub fn get_depth_book_snapshot(&self, product: &Product) -> Vec<DepthLevel> {
        self.book.snapshot(product)
    }

    /// Levels as persisted at the last block end.
    pub fn get_depth_book_from_store(&self, product: &Product) -> Result<Vec<DepthLevel>> {
        self.store.depth_levels(product)
    }

    /// Live FIFO queue at one price and side.
    #[must_use]
    pub fn get_price_level_order_ids(
        &self,
        product: &Product,
        price: &Decimal,
        side: OrderSide,
    ) -> Vec<OrderId> {
        self.book
            .product(product)
            .map(|book| book.order_ids(price, side))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn last_block_summary(&self) -> Option<&BlockSummary> {
        self.published.as_ref()
    }

    /// Match result of the last ended block, until the next block begins.
    #[must_use]
    pub fn get_block_match_result(&self) -> Option<&BlockMatchResult> {
        self.published.as_ref().map(|s| &s.match_result)
    }

    #[must_use]
    pub fn get_closed_order_ids(&self) -> &[OrderId] {
        self.published
            .as_ref()
            .map_or(&[], |s| s.closed_order_ids.as_slice())
    }

    #[must_use]
    pub fn get_updated_order_ids(&self) -> &[OrderId] {
        self.published
            .as_ref()
            .map_or(&[], |s| s.updated_order_ids.as_slice())
    }

    pub fn get_product_lock(&self, product: &Product) -> Result<Option<ProductLock>> {
        self.store.product_lock(product)
    }

    pub fn get_block_order_num(&self, height: u64) -> Result<u64> {
        self.store.block_order_num(height)
    }

    pub fn get_last_expired_block_height(&self) -> Result<u64> {
        self.store.last_expired_block_height()
    }

    // =================================================================
    // Accessors
    // =================================================================

    #[must_use]
    pub fn store(&self) -> &OrderStore<S> {
        &self.store
    }

    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    #[must_use]
    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    /// Tear the engine down, dropping any block in progress.
    #[must_use]
    pub fn into_parts(self) -> (S, L, R) {
        (self.store.into_inner(), self.ledger, self.registry)
    }
}

fn rebuild_book<S: StateStore>(store: &OrderStore<S>) -> Result<DepthBook> {
    let mut book = DepthBook::new();
    for (product, price, side, ids) in store.all_price_levels()? {
        for id in ids {
            let order = store
                .get_order(&id)?
                .ok_or_else(|| corrupt_queue(&product, price, side, format!("order {id} missing")))?;
            if order.product != product || order.side != side || order.price != price {
                return Err(corrupt_queue(
                    &product,
                    price,
                    side,
                    format!(
                        "order {id} belongs to {} {} @ {}",
                        order.product, order.side, order.price
                    ),
                ));
            }
            if !order.is_open() {
                return Err(corrupt_queue(
                    &product,
                    price,
                    side,
                    format!("order {id} is {}", order.status),
                ));
            }
            book.insert_order(&order)?;
        }
    }

    let products: BTreeSet<Product> = store
        .depth_products()?
        .into_iter()
        .chain(book.products())
        .collect();
    for product in products {
        if let Some(product_book) = book.product(&product) {
            product_book.check_consistency()?;
        }
        if store.depth_levels(&product)? != book.snapshot(&product) {
            return Err(BlockmatchError::CorruptState {
                key: format!("depth/{product}"),
                reason: "persisted levels disagree with the order queues".to_string(),
            });
        }
    }

    // Everything rebuilt is already persisted.
    book.take_deltas();
    Ok(book)
}

fn corrupt_queue(
    product: &Product,
    price: Decimal,
    side: OrderSide,
    reason: String,
) -> BlockmatchError {
    BlockmatchError::CorruptState {
        key: format!("queue/{product}/{side}/{price}"),
        reason,
    }
}
