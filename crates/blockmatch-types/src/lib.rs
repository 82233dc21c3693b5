//! # blockmatch-types
//!
//! Shared types, errors, and parameters for the **BlockMatch** engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrderId`], [`AccountId`], [`Product`]
//! - **Order model**: [`Order`], [`NewOrder`], [`OrderSide`], [`OrderStatus`], [`Closure`]
//! - **Match model**: [`Deal`], [`MatchResult`], [`BlockMatchResult`]
//! - **Busy-market state**: [`ProductLock`]
//! - **Depth snapshots**: [`DepthLevel`]
//! - **Funds**: [`Coin`], [`BalanceEntry`]
//! - **Parameters**: [`Params`]
//! - **Errors**: [`BlockmatchError`] with `BM_ERR_` prefix codes
//! - **Constants**: precisions and defaults

pub mod balance;
pub mod config;
pub mod constants;
pub mod deal;
pub mod depth;
pub mod error;
pub mod ids;
pub mod lock;
pub mod order;

pub use balance::*;
pub use config::*;
pub use deal::*;
pub use depth::*;
pub use error::*;
pub use ids::*;
pub use lock::*;
pub use order::*;

// Constants are accessed via `blockmatch_types::constants::FOO`
// (not re-exported to avoid name collisions).
