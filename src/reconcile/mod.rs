//! Reconciliation core
//!
//! The differ computes the minimal add/remove plan between declared and
//! observed membership; the orchestrator drives one resource instance through
//! read, diff, apply, and verify against an [`crate::domain::ArrayApi`].

pub mod differ;
pub mod orchestrator;

pub use differ::{diff, ReconciliationPlan};
pub use orchestrator::{reconcile, ReconcileReport, ReconcileState};
