//! Integration test infrastructure for the BACnet data-link port layer
//!
//! Provides:
//! - Recording transport fakes that log every lifecycle call
//! - Registry and dispatcher fixtures on a manually driven clock
//! - Call-order verification helpers

pub mod fixtures;
mod verification;

pub use fixtures::*;
pub use verification::*;
