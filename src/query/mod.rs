//! Bounded execution of authorized statements.
//!
//! This module isolates the final authorization re-check and row capping
//! from the gateway orchestrator.

pub mod executor;

pub use executor::{apply_row_limit, BoundedExecutor, QueryOutcome};
