//! Supply conservation invariant checker.
//!
//! Enforced after settlement:
//! ```text
//! ∀ denom: Σ(available + locked) + clearing == Σ(deposits) - Σ(withdrawals)
//! ```
//!
//! Fees move to the fee collector's account and stay inside the sum.

use std::collections::{BTreeMap, BTreeSet};

use blockmatch_types::{BlockmatchError, Denom, Result};
use rust_decimal::Decimal;

/// Tracks per-denomination supply totals.
#[derive(Debug, Clone, Default)]
pub struct SupplyConservation {
    deposits: BTreeMap<Denom, Decimal>,
    withdrawals: BTreeMap<Denom, Decimal>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deposit(&mut self, denom: &str, amount: Decimal) {
        *self.deposits.entry(denom.to_string()).or_insert(Decimal::ZERO) += amount;
    }

    pub fn record_withdrawal(&mut self, denom: &str, amount: Decimal) {
        *self
            .withdrawals
            .entry(denom.to_string())
            .or_insert(Decimal::ZERO) += amount;
    }

    /// Expected total supply: deposits - withdrawals.
    #[must_use]
    pub fn expected_supply(&self, denom: &str) -> Decimal {
        self.total_deposits(denom) - self.total_withdrawals(denom)
    }

    /// # Errors
    /// Returns [`BlockmatchError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, denom: &str, actual_supply: Decimal) -> Result<()> {
        let expected = self.expected_supply(denom);
        if actual_supply != expected {
            return Err(BlockmatchError::SupplyInvariantViolation {
                reason: format!(
                    "{denom}: actual supply {actual_supply} != expected {expected} \
                     (deposits={}, withdrawals={})",
                    self.total_deposits(denom),
                    self.total_withdrawals(denom),
                ),
            });
        }
        Ok(())
    }

    /// Every denomination ever deposited or withdrawn, sorted.
    #[must_use]
    pub fn tracked_denoms(&self) -> BTreeSet<Denom> {
        self.deposits
            .keys()
            .chain(self.withdrawals.keys())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn total_deposits(&self, denom: &str) -> Decimal {
        self.deposits.get(denom).copied().unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn total_withdrawals(&self, denom: &str) -> Decimal {
        self.withdrawals.get(denom).copied().unwrap_or(Decimal::ZERO)
    }
}
