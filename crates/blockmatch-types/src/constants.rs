//! System-wide constants for the BlockMatch engine.

use rust_decimal::Decimal;

/// Decimal places kept when computing trade fees.
pub const FEE_PRECISION: u32 = 8;

/// Default cap on deals per product per block.
pub const DEFAULT_MAX_DEALS_PER_BLOCK: u32 = 1000;

/// Default lifetime of an order, in blocks.
pub const DEFAULT_ORDER_EXPIRE_BLOCKS: u64 = 86_400;

/// Default trade fee rate: 0.1% of proceeds.
pub const DEFAULT_TRADE_FEE_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

/// Default flat settlement fee: 0.2592 of the fee denomination.
pub const DEFAULT_SETTLEMENT_FEE: Decimal = Decimal::from_parts(2592, 0, 0, false, 4);

/// Default fee denomination.
pub const DEFAULT_FEE_DENOM: &str = "native";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "BlockMatch";
