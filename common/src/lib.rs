//! Teller Common Types
//!
//! This crate contains the types shared across the Teller ledger:
//! identifiers, monetary helpers, and the error taxonomy.

pub mod error;
pub mod identifiers;
pub mod monetary;

pub use error::*;
pub use identifiers::*;
pub use monetary::*;
