//! Error types for the BlockMatch engine.
//!
//! All errors use the `BM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order validation errors
//! - 2xx: Funds errors
//! - 4xx: Block lifecycle errors
//! - 5xx: Matching / invariant errors
//! - 6xx: Storage errors
//! - 9xx: Configuration / internal errors
//!
//! Validation and funds errors are returned to the caller of a transaction
//! and leave state untouched. Everything [`BlockmatchError::is_fatal`]
//! reports as fatal must abort block processing.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{OrderId, OrderStatus, Product};

/// Central error enum for all BlockMatch operations.
#[derive(Debug, Error)]
pub enum BlockmatchError {
    // =================================================================
    // Order Validation Errors (1xx)
    // =================================================================
    /// The requested order is not in the order store.
    #[error("BM_ERR_100: Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order failed validation (non-positive price or quantity, ...).
    #[error("BM_ERR_101: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    /// The product is not known to the trading-pair registry.
    #[error("BM_ERR_102: Unknown product: {0}")]
    UnknownProduct(Product),

    /// The product has been delisted and no longer accepts orders.
    #[error("BM_ERR_103: Product delisted: {0}")]
    ProductDelisted(Product),

    /// The order is already closed.
    #[error("BM_ERR_104: Order {id} cannot be cancelled in status {status}")]
    OrderNotCancellable { id: OrderId, status: OrderStatus },

    /// The caller does not own the order.
    #[error("BM_ERR_105: Order {0} does not belong to the caller")]
    Unauthorized(OrderId),

    /// The product is settling a busy-market match across blocks.
    #[error("BM_ERR_106: Product {0} is locked by an unfinished match")]
    ProductBusy(Product),

    /// A product symbol could not be parsed.
    #[error("BM_ERR_107: Invalid product symbol: {0}")]
    InvalidProduct(String),

    /// An order ID string could not be parsed.
    #[error("BM_ERR_108: Invalid order id: {0}")]
    InvalidOrderId(String),

    // =================================================================
    // Funds Errors (2xx)
    // =================================================================
    /// Not enough available balance to reserve for an order.
    #[error("BM_ERR_200: Insufficient {denom}: need {needed}, have {available}")]
    InsufficientFunds {
        denom: String,
        needed: Decimal,
        available: Decimal,
    },

    /// Not enough locked balance to settle or release.
    #[error("BM_ERR_201: Insufficient locked {denom}: need {needed}, have {locked}")]
    InsufficientLocked {
        denom: String,
        needed: Decimal,
        locked: Decimal,
    },

    /// Supply of a denomination changed outside deposits and withdrawals.
    #[error("BM_ERR_202: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    /// A balance, reservation or resting total would leave the decimal range.
    #[error("BM_ERR_203: Amount of {denom} out of range")]
    AmountOverflow { denom: String },

    // =================================================================
    // Block Lifecycle Errors (4xx)
    // =================================================================
    /// A transaction or `end_block` arrived outside an open block.
    #[error("BM_ERR_400: No block in progress")]
    NoBlockInProgress,

    /// `begin_block` was called with a height that does not advance.
    #[error("BM_ERR_401: Block height {requested} does not follow {last}")]
    HeightNotAdvancing { requested: u64, last: u64 },

    /// `begin_block` was called before the open block was ended.
    #[error("BM_ERR_402: Block {0} is still in progress")]
    BlockInProgress(u64),

    // =================================================================
    // Matching / Invariant Errors (5xx)
    // =================================================================
    /// Depth book, queues and order store disagree.
    #[error("BM_ERR_500: Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    /// A deal references an order missing from the store.
    #[error("BM_ERR_501: Deal references missing order {0}")]
    DealOrderMissing(OrderId),

    // =================================================================
    // Storage Errors (6xx)
    // =================================================================
    /// Serialization / deserialization of a persisted record failed.
    #[error("BM_ERR_600: Serialization error: {0}")]
    Serialization(String),

    /// A persisted record is unreadable or inconsistent.
    #[error("BM_ERR_601: Corrupt state at key {key}: {reason}")]
    CorruptState { key: String, reason: String },

    // =================================================================
    // Configuration / Internal (9xx)
    // =================================================================
    /// Invalid parameters.
    #[error("BM_ERR_900: Configuration error: {0}")]
    Configuration(String),

    /// Unrecoverable internal error.
    #[error("BM_ERR_901: Internal error: {0}")]
    Internal(String),
}

impl BlockmatchError {
    /// Whether this error must abort block processing.
    ///
    /// Fatal errors mean replicated state can no longer be trusted;
    /// everything else is a rejected transaction.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InsufficientLocked { .. }
                | Self::SupplyInvariantViolation { .. }
                | Self::InvariantViolation { .. }
                | Self::DealOrderMissing(_)
                | Self::Serialization(_)
                | Self::CorruptState { .. }
                | Self::Internal(_)
        )
    }

    /// Shorthand for an [`InvariantViolation`](Self::InvariantViolation).
    #[must_use]
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            reason: reason.into(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, BlockmatchError>;

impl From<serde_json::Error> for BlockmatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = BlockmatchError::OrderNotFound(OrderId::new(1, 1));
        let msg = format!("{err}");
        assert!(msg.starts_with("BM_ERR_100"), "Got: {msg}");
        assert!(msg.contains("ID0000000001-1"));
    }

    #[test]
    fn insufficient_funds_display() {
        let err = BlockmatchError::InsufficientFunds {
            denom: "okb".into(),
            needed: Decimal::new(100, 0),
            available: Decimal::new(50, 0),
        };
        let msg = format!("{err}");
        assert!(msg.contains("BM_ERR_200"));
        assert!(msg.contains("okb"));
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn fatal_classification() {
        assert!(BlockmatchError::invariant("book drift").is_fatal());
        assert!(BlockmatchError::DealOrderMissing(OrderId::new(1, 1)).is_fatal());
        assert!(
            !BlockmatchError::InvalidOrder {
                reason: "zero".into()
            }
            .is_fatal()
        );
        assert!(
            !BlockmatchError::InsufficientFunds {
                denom: "okb".into(),
                needed: Decimal::ONE,
                available: Decimal::ZERO,
            }
            .is_fatal()
        );
        assert!(
            !BlockmatchError::AmountOverflow {
                denom: "usdt".into()
            }
            .is_fatal()
        );
    }

    #[test]
    fn all_errors_have_bm_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(BlockmatchError::NoBlockInProgress),
            Box::new(BlockmatchError::Configuration("x".into())),
            Box::new(BlockmatchError::Internal("test".into())),
            Box::new(BlockmatchError::InvalidProduct("a".into())),
            Box::new(BlockmatchError::CorruptState {
                key: "k".into(),
                reason: "r".into(),
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("BM_ERR_"),
                "Error missing BM_ERR_ prefix: {msg}"
            );
        }
    }
}
