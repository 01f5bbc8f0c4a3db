//! Concurrent execution of provisioning units.
//!
//! The batch orchestrator drives a fixed set of workers, each provisioning one unit at a time, and
//! aggregates the per-unit outcomes into a [`base::BatchSummary`].

pub mod base;
pub mod pool;
