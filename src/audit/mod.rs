//! Run ledger for laser-kinematics.
//!
//! Keeps cumulative counts of what has been analyzed so a lab can audit how
//! many recordings, frames and corrections went into an export.

pub mod log;

// Re-export commonly used types
pub use log::{create_shared_log, create_shared_log_with_persistence, RunLog, RunStats, SharedRunLog};
