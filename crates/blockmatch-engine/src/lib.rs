//! # blockmatch-engine
//!
//! Block lifecycle for the **BlockMatch** periodic matching engine.
//!
//! The host calls [`Engine::begin_block`], feeds order placements and
//! cancellations, then calls [`Engine::end_block`], which purges, expires,
//! matches, settles and publishes in a fixed order. Given the same store,
//! parameters and calls, every node ends the block with the same state and
//! the same deal root.
//!
//! - [`Engine`]: the state machine, generic over the host's
//!   [`StateStore`](blockmatch_store::StateStore),
//!   [`Ledger`](blockmatch_settlement::Ledger) and [`ProductRegistry`]
//! - [`BlockContext`]: what one block accumulates
//! - [`BlockSummary`]: what a finished block publishes
//! - [`ListedProducts`]: in-memory registry

mod auction;
pub mod context;
pub mod engine;
mod expiry;
mod placement;
pub mod registry;
mod tracker;

pub use context::{BlockContext, BlockSummary};
pub use engine::Engine;
pub use registry::{ListedProducts, Listing, ProductRegistry};
