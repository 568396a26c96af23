//! Canonical primitives for the admission pipeline.
//! Stable, protocol-neutral, behavior-free.
//!
//! Rule: No String identifiers in consensus state. Ever.

pub mod primitives;

pub use primitives::{Address, Amount, BlockHeight, Gas};
