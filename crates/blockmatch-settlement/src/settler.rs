//! Turns deals and closures into ledger calls.
//!
//! Per deal:
//! 1. Consume the executed spend from the order's reservation
//! 2. Credit the proceeds minus the trade fee
//! 3. Route the trade fee to the fee collector
//!
//! Per closure:
//! 1. Release the reservation of the unexecuted quantity
//! 2. Charge the settlement fee reserved at placement, or release it when
//!    the product was delisted. Fee changes since placement do not apply.
//!
//! Any ledger error here means the reservations no longer match the
//! order book; callers treat it as fatal.

use std::collections::BTreeMap;

use blockmatch_types::{BlockmatchError, CloseReason, Coin, Deal, Denom, Order, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fees::FeeSchedule;
use crate::ledger::Ledger;

/// Funds moved for one deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealSettlement {
    pub spent: Coin,
    /// Credited to the order's sender, after the fee.
    pub received: Coin,
    pub fee: Coin,
}

/// Funds moved for one closure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureSettlement {
    pub released: Coin,
    /// `None` when the fee was waived.
    pub settlement_fee: Option<Coin>,
}

/// Settles one block's deals and closures and totals the fees collected.
#[derive(Debug, Clone)]
pub struct Settler {
    fees: FeeSchedule,
    collected: BTreeMap<Denom, Decimal>,
}

impl Settler {
    #[must_use]
    pub fn new(fees: FeeSchedule) -> Self {
        Self {
            fees,
            collected: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    /// Settle one deal of `order`.
    ///
    /// # Errors
    /// `InvariantViolation` if the deal does not belong to `order`; any
    /// ledger error.
    pub fn settle_deal<L: Ledger>(
        &mut self,
        ledger: &mut L,
        order: &Order,
        deal: &Deal,
    ) -> Result<DealSettlement> {
        if deal.order_id != order.id || deal.side != order.side || deal.price != order.price {
            return Err(BlockmatchError::invariant(format!(
                "{deal} settled against order {} {} @ {}",
                order.id, order.side, order.price
            )));
        }
        let spent = Coin::new(order.spend_denom(), order.spend_for(deal.quantity)?);
        let proceeds = order.receive_for(deal.quantity)?;
        let fee = self.fees.trade_fee(order.receive_denom(), proceeds);
        let received = Coin::new(order.receive_denom(), proceeds - fee.amount);

        ledger.consume_locked(&order.sender, &spent)?;
        ledger.credit_funds(&order.sender, &received)?;
        ledger.collect_fee(&fee)?;
        self.record_fee(&fee)?;

        debug!(
            order_id = %order.id,
            spent = %spent,
            received = %received,
            fee = %fee,
            "Deal settled"
        );
        Ok(DealSettlement {
            spent,
            received,
            fee,
        })
    }

    /// Settle the closure of `order` (already in its closed status).
    ///
    /// # Errors
    /// `InvariantViolation` if the order is still open; any ledger error.
    pub fn settle_closure<L: Ledger>(
        &mut self,
        ledger: &mut L,
        order: &Order,
        reason: CloseReason,
    ) -> Result<ClosureSettlement> {
        if !order.status.is_closed() {
            return Err(BlockmatchError::invariant(format!(
                "closure settled for open order {}",
                order.id
            )));
        }
        let released = order.unexecuted_spend()?;
        if !released.is_zero() {
            ledger.release_funds(&order.sender, &released)?;
        }

        let settlement_fee = match order.settlement_fee_reserved.clone() {
            Some(fee) if reason.charges_settlement_fee() => {
                ledger.consume_locked(&order.sender, &fee)?;
                ledger.collect_fee(&fee)?;
                self.record_fee(&fee)?;
                Some(fee)
            }
            Some(fee) => {
                ledger.release_funds(&order.sender, &fee)?;
                None
            }
            None => None,
        };

        debug!(
            order_id = %order.id,
            status = %order.status,
            released = %released,
            charged = settlement_fee.is_some(),
            "Closure settled"
        );
        Ok(ClosureSettlement {
            released,
            settlement_fee,
        })
    }

    fn record_fee(&mut self, fee: &Coin) -> Result<()> {
        if fee.is_zero() {
            return Ok(());
        }
        let total = self
            .collected
            .entry(fee.denom.clone())
            .or_insert(Decimal::ZERO);
        *total = total.checked_add(fee.amount).ok_or_else(|| {
            BlockmatchError::invariant(format!("{} fees collected overflow", fee.denom))
        })?;
        Ok(())
    }

    /// Fees collected so far, per denomination.
    #[must_use]
    pub fn collected(&self) -> &BTreeMap<Denom, Decimal> {
        &self.collected
    }

    /// Hand over the fee totals and start counting from zero.
    pub fn take_collected(&mut self) -> BTreeMap<Denom, Decimal> {
        std::mem::take(&mut self.collected)
    }
}

#[cfg(test)]
mod tests {
    use blockmatch_types::{AccountId, OrderId, OrderSide};

    use super::*;
    use crate::fees::placement_reservation;
    use crate::ledger::BalanceLedger;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn placed(ledger: &mut BalanceLedger, order: Order, owner: AccountId) -> Order {
        let mut order = order.with_settlement_fee(&FeeSchedule::default().settlement_fee);
        order.sender = owner;
        ledger
            .lock_funds(&owner, &placement_reservation(&order).unwrap())
            .unwrap();
        order
    }

    fn ledger_with(owner: &AccountId) -> BalanceLedger {
        let mut ledger = BalanceLedger::new(AccountId::from_bytes([7; 16]));
        for (denom, amount) in [("usdt", "100"), ("btc", "10"), ("native", "10")] {
            ledger.deposit(owner, &Coin::new(denom, dec(amount))).unwrap();
        }
        ledger
    }

    #[test]
    fn buy_deal_pays_quote_and_receives_base_minus_fee() {
        let owner = AccountId::new();
        let mut ledger = ledger_with(&owner);
        let mut order = placed(
            &mut ledger,
            Order::dummy(10, 1, OrderSide::Buy, dec("10.0"), dec("1.0")),
            owner,
        );
        let mut settler = Settler::new(FeeSchedule::default());
        let deal = Deal {
            order_id: order.id,
            side: OrderSide::Buy,
            quantity: dec("1.0"),
            price: dec("10.0"),
        };

        let settled = settler.settle_deal(&mut ledger, &order, &deal).unwrap();
        assert_eq!(settled.spent, Coin::new("usdt", dec("10.0")));
        assert_eq!(settled.fee, Coin::new("btc", dec("0.001")));
        assert_eq!(settled.received, Coin::new("btc", dec("0.999")));
        assert_eq!(ledger.balance(&owner, "btc").available, dec("10.999"));

        order.fill(dec("1.0")).unwrap();
        let closed = settler
            .settle_closure(&mut ledger, &order, CloseReason::Filled)
            .unwrap();
        assert!(closed.released.is_zero());
        assert_eq!(closed.settlement_fee, Some(Coin::new("native", dec("0.2592"))));
        assert_eq!(ledger.balance(&owner, "native").locked, Decimal::ZERO);
        assert_eq!(ledger.balance(&owner, "native").available, dec("9.7408"));
        assert_eq!(settler.collected().get("native"), Some(&dec("0.2592")));
        assert_eq!(settler.collected().get("btc"), Some(&dec("0.001")));
    }

    #[test]
    fn sell_deal_fee_in_quote() {
        let owner = AccountId::new();
        let mut ledger = ledger_with(&owner);
        let order = placed(
            &mut ledger,
            Order::dummy(10, 3, OrderSide::Sell, dec("10.0"), dec("2.5")),
            owner,
        );
        let mut settler = Settler::new(FeeSchedule::default());
        let deal = Deal {
            order_id: order.id,
            side: OrderSide::Sell,
            quantity: dec("0.5"),
            price: dec("10.0"),
        };
        let settled = settler.settle_deal(&mut ledger, &order, &deal).unwrap();
        assert_eq!(settled.spent, Coin::new("btc", dec("0.5")));
        assert_eq!(settled.fee, Coin::new("usdt", dec("0.005")));
        assert_eq!(ledger.balance(&owner, "btc").locked, dec("2.0"));
    }

    #[test]
    fn expiry_releases_remaining_and_charges_fee() {
        let owner = AccountId::new();
        let mut ledger = ledger_with(&owner);
        let mut order = placed(
            &mut ledger,
            Order::dummy(10, 1, OrderSide::Buy, dec("9.8"), dec("1.0")),
            owner,
        );
        order.close(CloseReason::Expired).unwrap();
        let mut settler = Settler::new(FeeSchedule::default());
        let closed = settler
            .settle_closure(&mut ledger, &order, CloseReason::Expired)
            .unwrap();
        assert_eq!(closed.released, Coin::new("usdt", dec("9.8")));
        assert!(closed.settlement_fee.is_some());
        let usdt = ledger.balance(&owner, "usdt");
        assert_eq!(usdt.available, dec("100"));
        assert_eq!(usdt.locked, Decimal::ZERO);
    }

    #[test]
    fn delisting_waives_settlement_fee() {
        let owner = AccountId::new();
        let mut ledger = ledger_with(&owner);
        let mut order = placed(
            &mut ledger,
            Order::dummy(10, 2, OrderSide::Sell, dec("10"), dec("1")),
            owner,
        );
        order.close(CloseReason::Delisted).unwrap();
        let mut settler = Settler::new(FeeSchedule::default());
        let closed = settler
            .settle_closure(&mut ledger, &order, CloseReason::Delisted)
            .unwrap();
        assert!(closed.settlement_fee.is_none());
        assert_eq!(ledger.balance(&owner, "native").available, dec("10"));
        assert_eq!(ledger.balance(&owner, "btc").available, dec("10"));
        assert!(settler.take_collected().is_empty());
        ledger.verify_all_supply().unwrap();
    }

    #[test]
    fn closure_charges_the_fee_reserved_at_placement() {
        let owner = AccountId::new();
        let mut ledger = ledger_with(&owner);
        let mut order = placed(
            &mut ledger,
            Order::dummy(10, 1, OrderSide::Buy, dec("9"), dec("1")),
            owner,
        );
        order.close(CloseReason::Cancelled).unwrap();

        let raised = FeeSchedule {
            settlement_fee: Coin::new("native", dec("0.5")),
            ..FeeSchedule::default()
        };
        let closed = Settler::new(raised)
            .settle_closure(&mut ledger, &order, CloseReason::Cancelled)
            .unwrap();
        assert_eq!(closed.settlement_fee, Some(Coin::new("native", dec("0.2592"))));
        let native = ledger.balance(&owner, "native");
        assert_eq!(native.available, dec("9.7408"));
        assert_eq!(native.locked, Decimal::ZERO);
        ledger.verify_all_supply().unwrap();
    }

    #[test]
    fn mismatched_deal_is_an_invariant_violation() {
        let owner = AccountId::new();
        let mut ledger = ledger_with(&owner);
        let order = placed(
            &mut ledger,
            Order::dummy(10, 1, OrderSide::Buy, dec("10"), dec("1")),
            owner,
        );
        let deal = Deal {
            order_id: OrderId::new(10, 2),
            side: OrderSide::Buy,
            quantity: dec("1"),
            price: dec("10"),
        };
        let err = Settler::new(FeeSchedule::default())
            .settle_deal(&mut ledger, &order, &deal)
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn open_order_cannot_settle_closure() {
        let owner = AccountId::new();
        let mut ledger = ledger_with(&owner);
        let order = placed(
            &mut ledger,
            Order::dummy(10, 1, OrderSide::Buy, dec("10"), dec("1")),
            owner,
        );
        assert!(
            Settler::new(FeeSchedule::default())
                .settle_closure(&mut ledger, &order, CloseReason::Cancelled)
                .is_err()
        );
    }
}
