//! The ledger contract and an in-memory implementation.
//!
//! Every account holds, per denomination, an `available` balance (usable
//! for new orders) and a `locked` balance (reserved by open orders).
//!
//! The lifecycle of an order's funds:
//! 1. `lock_funds` when the order is placed (available → locked)
//! 2. `consume_locked` per deal (locked → clearing)
//! 3. `credit_funds` with the deal's proceeds (clearing → available)
//! 4. `collect_fee` for trade and settlement fees (clearing → fee collector)
//! 5. `release_funds` for whatever was never executed (locked → available)

use std::collections::BTreeMap;

use blockmatch_types::{AccountId, BalanceEntry, BlockmatchError, Coin, Denom, Result};
use rust_decimal::Decimal;
use tracing::debug;

use crate::supply_conservation::SupplyConservation;

/// Balance custody consumed by the engine.
///
/// Every call is atomic: it either applies fully or returns an error with
/// no effect.
pub trait Ledger {
    /// Reserve all `coins` for an order, or none of them.
    ///
    /// # Errors
    /// `InsufficientFunds` naming the first short denomination.
    fn lock_funds(&mut self, account: &AccountId, coins: &[Coin]) -> Result<()>;

    /// Return reserved funds to the account's available balance.
    ///
    /// # Errors
    /// `InsufficientLocked` if less than `coin` is reserved.
    fn release_funds(&mut self, account: &AccountId, coin: &Coin) -> Result<()>;

    /// Take reserved funds out of the account to pay for a deal or fee.
    ///
    /// # Errors
    /// `InsufficientLocked` if less than `coin` is reserved.
    fn consume_locked(&mut self, account: &AccountId, coin: &Coin) -> Result<()>;

    /// Pay deal proceeds into the account's available balance.
    fn credit_funds(&mut self, account: &AccountId, coin: &Coin) -> Result<()>;

    /// Route a fee to the fee collector.
    fn collect_fee(&mut self, coin: &Coin) -> Result<()>;
}

/// In-memory [`Ledger`] with supply conservation.
///
/// Funds consumed by deals pass through a per-denomination clearing
/// balance before they are credited. Within one fully settled price level
/// the clearing balance returns to zero; while a busy-market settlement is
/// in progress it carries the difference between the two sides.
#[derive(Debug, Clone)]
pub struct BalanceLedger {
    balances: BTreeMap<(AccountId, Denom), BalanceEntry>,
    clearing: BTreeMap<Denom, Decimal>,
    fee_collector: AccountId,
    supply: SupplyConservation,
}

impl BalanceLedger {
    #[must_use]
    pub fn new(fee_collector: AccountId) -> Self {
        Self {
            balances: BTreeMap::new(),
            clearing: BTreeMap::new(),
            fee_collector,
            supply: SupplyConservation::new(),
        }
    }

    #[must_use]
    pub fn fee_collector(&self) -> AccountId {
        self.fee_collector
    }

    /// Balance of an (account, denom) pair; zero if absent.
    #[must_use]
    pub fn balance(&self, account: &AccountId, denom: &str) -> BalanceEntry {
        self.balances
            .get(&(*account, denom.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Amount of `denom` in transit between consumed and credited.
    #[must_use]
    pub fn clearing_balance(&self, denom: &str) -> Decimal {
        self.clearing.get(denom).copied().unwrap_or(Decimal::ZERO)
    }

    fn entry_mut(&mut self, account: &AccountId, denom: &str) -> &mut BalanceEntry {
        self.balances
            .entry((*account, denom.to_string()))
            .or_default()
    }

    fn clearing_mut(&mut self, denom: &str) -> &mut Decimal {
        self.clearing.entry(denom.to_string()).or_insert(Decimal::ZERO)
    }

    // =================================================================
    // Deposits and withdrawals
    // =================================================================

    /// # Errors
    /// Returns `InvalidOrder` if amount is not positive, `AmountOverflow`
    /// if the balance or the denomination's supply would leave the range.
    pub fn deposit(&mut self, account: &AccountId, coin: &Coin) -> Result<()> {
        ensure_positive(coin, "Deposit")?;
        let denom = coin.denom.as_str();
        checked_add(self.supply.total_deposits(denom), coin.amount, denom)?;
        let available = checked_add(self.balance(account, denom).available, coin.amount, denom)?;
        self.entry_mut(account, denom).available = available;
        self.supply.record_deposit(denom, coin.amount);
        Ok(())
    }

    /// # Errors
    /// Returns `InsufficientFunds` if not enough is available.
    pub fn withdraw(&mut self, account: &AccountId, coin: &Coin) -> Result<()> {
        ensure_positive(coin, "Withdraw")?;
        let entry = self.entry_mut(account, &coin.denom);
        if entry.available < coin.amount {
            return Err(BlockmatchError::InsufficientFunds {
                denom: coin.denom.clone(),
                needed: coin.amount,
                available: entry.available,
            });
        }
        entry.available -= coin.amount;
        self.supply.record_withdrawal(&coin.denom, coin.amount);
        Ok(())
    }

    // =================================================================
    // Supply
    // =================================================================

    /// Sum of every account balance plus the clearing balance.
    #[must_use]
    pub fn actual_supply(&self, denom: &str) -> Decimal {
        let held: Decimal = self
            .balances
            .iter()
            .filter(|((_, d), _)| d == denom)
            .map(|(_, entry)| entry.total())
            .sum();
        held + self.clearing_balance(denom)
    }

    /// # Errors
    /// `SupplyInvariantViolation` if the denomination's supply drifted.
    pub fn verify_supply(&self, denom: &str) -> Result<()> {
        self.supply.verify(denom, self.actual_supply(denom))
    }

    /// # Errors
    /// `SupplyInvariantViolation` for the first denomination that drifted.
    pub fn verify_all_supply(&self) -> Result<()> {
        for denom in self.supply.tracked_denoms() {
            self.verify_supply(&denom)?;
        }
        Ok(())
    }

    fn pay_out_of_clearing(&mut self, account: &AccountId, coin: &Coin) -> Result<()> {
        let clearing = self
            .clearing_balance(&coin.denom)
            .checked_sub(coin.amount)
            .ok_or_else(|| settlement_overflow(coin))?;
        let available = settled_sum(self.balance(account, &coin.denom).available, coin)?;
        *self.clearing_mut(&coin.denom) = clearing;
        self.entry_mut(account, &coin.denom).available = available;
        Ok(())
    }

    fn take_locked(&mut self, account: &AccountId, coin: &Coin) -> Result<()> {
        let entry = self.entry_mut(account, &coin.denom);
        if entry.locked < coin.amount {
            return Err(BlockmatchError::InsufficientLocked {
                denom: coin.denom.clone(),
                needed: coin.amount,
                locked: entry.locked,
            });
        }
        entry.locked -= coin.amount;
        Ok(())
    }
}

impl Ledger for BalanceLedger {
    fn lock_funds(&mut self, account: &AccountId, coins: &[Coin]) -> Result<()> {
        let mut needed: BTreeMap<&str, Decimal> = BTreeMap::new();
        for coin in coins {
            ensure_non_negative(coin)?;
            let total = needed.entry(coin.denom.as_str()).or_insert(Decimal::ZERO);
            *total = checked_add(*total, coin.amount, &coin.denom)?;
        }
        let mut updates = Vec::with_capacity(needed.len());
        for (denom, amount) in needed {
            let balance = self.balance(account, denom);
            if balance.available < amount {
                return Err(BlockmatchError::InsufficientFunds {
                    denom: denom.to_string(),
                    needed: amount,
                    available: balance.available,
                });
            }
            let locked = checked_add(balance.locked, amount, denom)?;
            updates.push((denom, balance.available - amount, locked));
        }
        for (denom, available, locked) in updates {
            let entry = self.entry_mut(account, denom);
            entry.available = available;
            entry.locked = locked;
        }
        Ok(())
    }

    fn release_funds(&mut self, account: &AccountId, coin: &Coin) -> Result<()> {
        ensure_non_negative(coin)?;
        let available = settled_sum(self.balance(account, &coin.denom).available, coin)?;
        self.take_locked(account, coin)?;
        self.entry_mut(account, &coin.denom).available = available;
        Ok(())
    }

    fn consume_locked(&mut self, account: &AccountId, coin: &Coin) -> Result<()> {
        ensure_non_negative(coin)?;
        let clearing = settled_sum(self.clearing_balance(&coin.denom), coin)?;
        self.take_locked(account, coin)?;
        *self.clearing_mut(&coin.denom) = clearing;
        Ok(())
    }

    fn credit_funds(&mut self, account: &AccountId, coin: &Coin) -> Result<()> {
        ensure_non_negative(coin)?;
        self.pay_out_of_clearing(account, coin)
    }

    fn collect_fee(&mut self, coin: &Coin) -> Result<()> {
        ensure_non_negative(coin)?;
        if coin.is_zero() {
            return Ok(());
        }
        let collector = self.fee_collector;
        self.pay_out_of_clearing(&collector, coin)?;
        debug!(fee = %coin, collector = %collector, "Fee collected");
        Ok(())
    }
}

fn ensure_positive(coin: &Coin, what: &str) -> Result<()> {
    if coin.amount <= Decimal::ZERO {
        return Err(BlockmatchError::InvalidOrder {
            reason: format!("{what} amount must be positive, got {coin}"),
        });
    }
    Ok(())
}

/// Sum for deposits and reservations; overflow rejects the call.
fn checked_add(a: Decimal, b: Decimal, denom: &str) -> Result<Decimal> {
    a.checked_add(b).ok_or_else(|| BlockmatchError::AmountOverflow {
        denom: denom.to_string(),
    })
}

/// Sum while settling; overflow there means the book is beyond repair.
fn settled_sum(balance: Decimal, coin: &Coin) -> Result<Decimal> {
    balance
        .checked_add(coin.amount)
        .ok_or_else(|| settlement_overflow(coin))
}

fn settlement_overflow(coin: &Coin) -> BlockmatchError {
    BlockmatchError::invariant(format!("{} balance overflow settling {coin}", coin.denom))
}

fn ensure_non_negative(coin: &Coin) -> Result<()> {
    if coin.amount < Decimal::ZERO {
        return Err(BlockmatchError::invariant(format!(
            "negative ledger amount {coin}"
        )));
    }
    Ok(())
}
