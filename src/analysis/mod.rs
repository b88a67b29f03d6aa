//! Analysis modules.
//!
//! Category key derivation and deduction tallying.

pub mod aggregator;
pub mod keys;

pub use aggregator::*;
pub use keys::KeyRule;
