//! Violation Policy
//!
//! Counts confirmed proctoring violations, suppresses duplicates inside a
//! cooldown window, and reports when the termination limit is reached.

mod ledger;

pub use ledger::{PolicyConfig, PolicyOutcome, Suppression, ViolationLedger, ViolationPolicy};
