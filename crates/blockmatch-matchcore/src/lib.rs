//! # blockmatch-matchcore
//!
//! **Depth book and periodic call auction for BlockMatch.**
//!
//! MatchCore is the compute plane: it holds the in-memory depth book and
//! turns it into deals once per block. It has:
//!
//! - **No I/O**: no store writes, no balance moves; callers persist and settle
//! - **Deterministic output**: sorted containers only, exact decimals
//! - **Same-price matching**: a Buy at P only meets a Sell at P
//! - **Bounded work**: a per-block deal budget, with [`ProductLock`]
//!   continuation state handed back to the caller
//!
//! [`ProductLock`]: blockmatch_types::ProductLock

pub mod depth_book;
pub mod determinism;
pub mod matcher;
pub mod price_level;

pub use depth_book::{BookDelta, DepthBook, ProductBook};
pub use determinism::{compute_deal_root, deal_root_hex, verify_deal_root};
pub use matcher::{LockTransition, MatchOutcome, resume_locked, run_auction};
pub use price_level::PriceLevel;
