//! Funds types shared by the engine and its ledger.
//!
//! Every account has an `available` balance (usable for new orders)
//! and a `locked` balance (reserved by open orders).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Type alias for denominations (e.g., "btc", "usdt", "native").
pub type Denom = String;

/// An amount of one denomination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: Denom,
    pub amount: Decimal,
}

impl Coin {
    #[must_use]
    pub fn new(denom: impl Into<Denom>, amount: Decimal) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl std::fmt::Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// A single balance entry for an (account, denom) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceEntry {
    /// Available for new orders / withdrawal.
    pub available: Decimal,
    /// Locked by open orders awaiting matching or settlement.
    pub locked: Decimal,
}

impl BalanceEntry {
    /// Create a zero balance.
    #[must_use]
    pub fn new() -> Self {
        Self {
            available: Decimal::ZERO,
            locked: Decimal::ZERO,
        }
    }

    /// Total balance (available + locked).
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.available + self.locked
    }

    /// Whether this entry has no balance at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.available.is_zero() && self.locked.is_zero()
    }
}

impl Default for BalanceEntry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_entry_default_is_zero() {
        let entry = BalanceEntry::default();
        assert_eq!(entry.available, Decimal::ZERO);
        assert_eq!(entry.locked, Decimal::ZERO);
        assert!(entry.is_zero());
    }

    #[test]
    fn balance_entry_total() {
        let entry = BalanceEntry {
            available: Decimal::new(100, 0),
            locked: Decimal::new(50, 0),
        };
        assert_eq!(entry.total(), Decimal::new(150, 0));
        assert!(!entry.is_zero());
    }

    #[test]
    fn coin_display() {
        let coin = Coin::new("native", Decimal::new(2592, 4));
        assert_eq!(coin.to_string(), "0.2592native");
        assert!(!coin.is_zero());
    }
}
