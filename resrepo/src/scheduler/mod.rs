//! Incremental update scheduling.
//!
//! - [`UpdateQueue`]: one worker, FIFO, panics contained
//! - [`ScanTracker`]: pending/running bookkeeping and scan supersession

mod queue;
mod tracker;

pub use queue::{QueueStats, UpdateJob, UpdateQueue};
pub use tracker::{ScanState, ScanTicket, ScanTracker};
