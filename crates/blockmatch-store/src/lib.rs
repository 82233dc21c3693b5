//! # blockmatch-store
//!
//! Typed persistence on top of an abstract key-value [`StateStore`].
//!
//! The host chain supplies the store and commits it atomically with the
//! rest of the block; this crate only decides key layout and encoding:
//!
//! - [`OrderStore`]: orders, per-height order counters (the expiry index),
//!   and FIFO order-ID queues per (product, price, side)
//! - Product locks, persisted depth levels, and block bookkeeping
//!   (closed order IDs, last expired height) as further `OrderStore`
//!   accessors
//! - [`MemStore`]: a `BTreeMap` store for tests and single-process use
//!
//! Values are JSON (`serde_json`); keys are byte strings with a one-byte
//! family prefix (see [`keys`]).

pub mod keys;
pub mod locks;
pub mod meta;
pub mod order_store;
pub mod store;

pub use order_store::OrderStore;
pub use store::{MemStore, StateStore};
