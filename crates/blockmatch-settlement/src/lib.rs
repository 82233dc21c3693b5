//! # blockmatch-settlement
//!
//! **Funds side of BlockMatch**: the ledger contract, fee arithmetic, and
//! the settler that turns deals and closures into ledger calls.
//!
//! ## Flow
//!
//! 1. Placement reserves the order's spend plus the flat settlement fee
//!    ([`placement_reservation`], [`Ledger::lock_funds`])
//! 2. Each deal consumes the reserved spend and credits the proceeds minus
//!    the trade fee ([`Settler::settle_deal`])
//! 3. Each closure releases the unexecuted spend and charges (or, on
//!    delisting, releases) the settlement fee ([`Settler::settle_closure`])
//! 4. [`BalanceLedger`] checks supply conservation per denomination
//!
//! Any ledger failure during steps 2 and 3 is fatal to the block.

pub mod fees;
pub mod ledger;
pub mod settler;
pub mod supply_conservation;

pub use fees::{FeeSchedule, placement_reservation, trade_fee};
pub use ledger::{BalanceLedger, Ledger};
pub use settler::{ClosureSettlement, DealSettlement, Settler};
pub use supply_conservation::SupplyConservation;
