//! Identifiers used throughout BlockMatch.
//!
//! Order IDs are derived from the block they were placed in, so every node
//! assigns the same ID to the same order. Account IDs are opaque UUIDs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::BlockmatchError;

// ---------------------------------------------------------------------------
// OrderId
// ---------------------------------------------------------------------------

/// Order identifier: `(creation height, ordinal within that block)`.
///
/// Formats as `ID{height:010}-{ordinal}`; the derived ordering is creation
/// order, which is also the global time priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderId {
    pub height: u64,
    pub ordinal: u64,
}

impl OrderId {
    #[must_use]
    pub fn new(height: u64, ordinal: u64) -> Self {
        Self { height, ordinal }
    }

    /// Common string prefix of every order ID created at `height`.
    ///
    /// Store keys embed the formatted ID, so this doubles as the
    /// per-height secondary index prefix.
    #[must_use]
    pub fn height_prefix(height: u64) -> String {
        format!("ID{height:010}-")
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID{:010}-{}", self.height, self.ordinal)
    }
}

impl FromStr for OrderId {
    type Err = BlockmatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || BlockmatchError::InvalidOrderId(s.to_string());
        let body = s.strip_prefix("ID").ok_or_else(malformed)?;
        let (height, ordinal) = body.split_once('-').ok_or_else(malformed)?;
        if height.len() < 10 {
            return Err(malformed());
        }
        let height = height.parse::<u64>().map_err(|_| malformed())?;
        let ordinal = ordinal.parse::<u64>().map_err(|_| malformed())?;
        if ordinal == 0 {
            return Err(malformed());
        }
        Ok(Self { height, ordinal })
    }
}

impl TryFrom<String> for OrderId {
    type Error = BlockmatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.to_string()
    }
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// Identity of an order sender / ledger account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl AccountId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Product
// ---------------------------------------------------------------------------

/// A trading pair, identified by its symbol `{base}_{quote}`.
///
/// The derived ordering compares the symbol first, so products sort
/// lexically by symbol. Every per-product loop relies on that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Product {
    symbol: String,
    base: String,
    quote: String,
}

impl Product {
    /// Build a product from its two denominations.
    ///
    /// # Errors
    /// Returns `InvalidProduct` if either side is empty or contains `_`.
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> crate::Result<Self> {
        let base = base.into();
        let quote = quote.into();
        if base.is_empty() || quote.is_empty() || base.contains('_') || quote.contains('_') {
            return Err(BlockmatchError::InvalidProduct(format!("{base}_{quote}")));
        }
        Ok(Self {
            symbol: format!("{base}_{quote}"),
            base,
            quote,
        })
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Denomination being bought or sold.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Denomination prices are quoted in.
    #[must_use]
    pub fn quote(&self) -> &str {
        &self.quote
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

impl FromStr for Product {
    type Err = BlockmatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once('_')
            .ok_or_else(|| BlockmatchError::InvalidProduct(s.to_string()))?;
        Self::new(base, quote)
    }
}

impl TryFrom<String> for Product {
    type Error = BlockmatchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Product> for String {
    fn from(product: Product) -> Self {
        product.symbol
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
