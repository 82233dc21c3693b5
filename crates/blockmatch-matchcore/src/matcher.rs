//! Periodic call auction with a per-block deal budget.
//!
//! ```text
//! run_auction(book, height, max_deals)    -> MatchOutcome
//! resume_locked(book, lock, max_deals)    -> MatchOutcome
//! ```
//!
//! Both functions only touch the [`ProductBook`] they are given. Applying
//! the deals to stored orders, persisting the lock and settling funds is the
//! caller's job.
//!
//! ## Allocation
//!
//! At a matching price the trade quantity is `min(buy depth, sell depth)`.
//! It is allocated against the Buy queue front to back, then against the
//! Sell queue front to back. Each order touched yields one [`Deal`].
//!
//! ## Deal budget
//!
//! `max_deals` caps deals per product per block across all levels. The
//! budget is checked before every deal while quantity is still owed; if it
//! runs out mid-level, the level's progress is returned as a
//! [`ProductLock`] and matching stops. A level is never started once the
//! budget is gone.

use blockmatch_types::{BlockmatchError, Deal, MatchResult, OrderSide, ProductLock, Result};
use rust_decimal::Decimal;
use tracing::debug;

use crate::depth_book::ProductBook;

/// What the caller must do with the product's lock record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockTransition {
    /// No lock before, none after.
    None,
    /// Store (create or overwrite) this lock.
    Set(ProductLock),
    /// The locked level finished settling; delete the lock.
    Released,
}

/// Result of one product's matching in one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// `None` when no deal was executed.
    pub result: Option<MatchResult>,
    pub lock: LockTransition,
}

impl MatchOutcome {
    fn idle() -> Self {
        Self {
            result: None,
            lock: LockTransition::None,
        }
    }

    /// Deals executed, in execution order.
    #[must_use]
    pub fn deals(&self) -> &[Deal] {
        self.result
            .as_ref()
            .map(|r| r.deals.as_slice())
            .unwrap_or_default()
    }
}

/// Start a fresh auction on an unlocked product.
///
/// Matching prices are processed in ascending order. The recorded
/// `(price, quantity)` is the last level processed; deals accumulate.
pub fn run_auction(book: &mut ProductBook, height: u64, max_deals: u32) -> Result<MatchOutcome> {
    let budget = budget(max_deals)?;
    let mut deals = Vec::new();
    let mut last: Option<(Decimal, Decimal)> = None;
    let mut lock_transition = LockTransition::None;

    for price in book.matching_prices() {
        if deals.len() >= budget {
            debug!(product = %book.product(), %price, "Deal budget spent, level left for a later block");
            break;
        }
        let level = book
            .level(&price)
            .ok_or_else(|| BlockmatchError::invariant(format!("matching level {price} vanished")))?;
        let quantity = level.buy_quantity.min(level.sell_quantity);
        let mut lock = ProductLock::new(height, price, quantity);
        last = Some((price, quantity));

        if !settle_level(book, &mut lock, budget, &mut deals)? {
            lock_transition = LockTransition::Set(lock);
            break;
        }
    }

    let Some((price, quantity)) = last else {
        return Ok(MatchOutcome::idle());
    };
    Ok(MatchOutcome {
        result: Some(MatchResult {
            block_height: height,
            price,
            quantity,
            deals,
        }),
        lock: lock_transition,
    })
}

/// Continue an interrupted settlement instead of starting an auction.
///
/// The published result keeps the lock's height, price and quantity.
pub fn resume_locked(
    book: &mut ProductBook,
    mut lock: ProductLock,
    max_deals: u32,
) -> Result<MatchOutcome> {
    let budget = budget(max_deals)?;
    let mut deals = Vec::new();
    let settled = settle_level(book, &mut lock, budget, &mut deals)?;

    let result = (!deals.is_empty()).then(|| MatchResult {
        block_height: lock.block_height,
        price: lock.price,
        quantity: lock.quantity,
        deals,
    });
    let lock = if settled {
        LockTransition::Released
    } else {
        LockTransition::Set(lock)
    };
    Ok(MatchOutcome { result, lock })
}

/// Drain the Buy queue, then the Sell queue, toward the lock's quantity.
///
/// Returns `true` once both sides are fully allocated, `false` if the
/// budget ran out first (the lock then holds the progress).
fn settle_level(
    book: &mut ProductBook,
    lock: &mut ProductLock,
    budget: usize,
    deals: &mut Vec<Deal>,
) -> Result<bool> {
    for side in [OrderSide::Buy, OrderSide::Sell] {
        while lock.outstanding(side) > Decimal::ZERO {
            if deals.len() >= budget {
                return Ok(false);
            }
            let order_id = book.head(&lock.price, side).ok_or_else(|| {
                BlockmatchError::invariant(format!(
                    "{} {side} queue at {} empty with {} still to allocate",
                    book.product(),
                    lock.price,
                    lock.outstanding(side)
                ))
            })?;
            let remaining = book
                .remaining(&order_id)
                .ok_or(BlockmatchError::DealOrderMissing(order_id))?;
            let quantity = remaining.min(lock.outstanding(side));

            book.reduce_order(&order_id, quantity)?;
            lock.record(side, quantity);
            debug!(
                product = %book.product(),
                order_id = %order_id,
                side = %side,
                price = %lock.price,
                quantity = %quantity,
                "Deal"
            );
            deals.push(Deal {
                order_id,
                side,
                quantity,
                price: lock.price,
            });
        }
    }
    Ok(true)
}

fn budget(max_deals: u32) -> Result<usize> {
    if max_deals == 0 {
        return Err(BlockmatchError::Configuration(
            "max_deals_per_block must be > 0".to_string(),
        ));
    }
    usize::try_from(max_deals).map_err(|e| BlockmatchError::Configuration(e.to_string()))
}
