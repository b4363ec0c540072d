//! Relationship Differ
//!
//! Pure set arithmetic between desired and observed membership. The differ
//! has no error conditions and performs no I/O; a missing input is simply the
//! empty set. Output order is sorted so plans are deterministic across passes
//! regardless of how either input was iterated when it was built.

use serde::Serialize;
use std::collections::BTreeSet;

/// The minimal operation set converging observed membership to desired.
///
/// `to_add` and `to_remove` are disjoint by construction and sorted. A plan
/// lives for exactly one reconciliation pass; it is consumed by the apply
/// step and surfaced to callers for audit logging, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

impl ReconciliationPlan {
    /// True when observed membership already matches desired
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Total number of membership mutations the plan will issue
    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }
}

/// Compute `(desired \ observed, observed \ desired)`.
pub fn diff(desired: &BTreeSet<String>, observed: &BTreeSet<String>) -> ReconciliationPlan {
    ReconciliationPlan {
        to_add: desired.difference(observed).cloned().collect(),
        to_remove: observed.difference(desired).cloned().collect(),
    }
}

/// Build a deduplicated desired set from declared member IDs. Declared order
/// and duplicates carry no meaning; the array treats membership as a set.
pub fn desired_set<I, S>(ids: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ids.into_iter().map(Into::into).collect()
}
