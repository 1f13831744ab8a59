//! insoledger-domain
//!
//! Pure domain models for the insolvency ledger engine (entries, rules,
//! effects, allocation, plans, audit rows, aggregates).
//! No I/O, no storage. Only data types and core enums.

pub mod aggregate;
pub mod allocation;
pub mod audit;
pub mod common;
pub mod effect;
pub mod entry;
pub mod plan;
pub mod rule;

pub use aggregate::*;
pub use allocation::*;
pub use audit::*;
pub use common::*;
pub use effect::*;
pub use entry::*;
pub use plan::*;
pub use rule::*;
