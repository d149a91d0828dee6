//! Reconciliation controller for annotation-driven path delegation.
//!
//! Children declare a parent and a path prefix through annotations; this
//! crate keeps each parent's include list consistent with those
//! declarations. The merger is pure; the engine orchestrates one
//! read-compute-write cycle per delivered event; the worker drains the
//! store's watch channel and applies retry policy.

pub mod merge;
pub mod reconciler;
pub mod worker;

pub use merge::{MergeError, merge, remove};
pub use reconciler::{ReconcileError, Reconciler};
pub use worker::{Controller, WorkerConfig};
