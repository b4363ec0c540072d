//! Reconciliation Orchestrator
//!
//! Drives one resource instance through the pass state machine:
//!
//! ```text
//! PlanningRead -> Diffing -> Applying -> VerifyRead -> Done
//!                    |
//!                    +--(empty plan)--------------------> Done
//! ```
//!
//! Any failing step aborts the pass and propagates the classified error
//! verbatim; the orchestrator itself never retries. Observed membership is
//! read fresh at the start of every pass and re-read after mutation, so the
//! caller always sees canonical post-apply state, never an assumed one.

use crate::domain::ports::{ArrayApi, MembershipResource};
use crate::error::{Error, Result};
use crate::reconcile::differ::{diff, ReconciliationPlan};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

// =============================================================================
// Pass States
// =============================================================================

/// States of one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReconcileState {
    PlanningRead,
    Diffing,
    Applying,
    VerifyRead,
    Done,
    Failed,
}

// =============================================================================
// Pass Report
// =============================================================================

/// Outcome of a successful pass, surfaced for audit logging
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport<R> {
    pub resource_id: String,
    /// The plan that was applied (empty when the pass short-circuited)
    pub plan: ReconciliationPlan,
    /// States visited, in order
    pub transitions: Vec<ReconcileState>,
    /// Canonical resource state after the pass
    pub refreshed: R,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl<R> ReconcileReport<R> {
    /// True when the pass made no mutating call
    pub fn converged_without_changes(&self) -> bool {
        self.plan.is_empty()
    }
}

// =============================================================================
// Reconcile
// =============================================================================

/// Run one reconciliation pass for `resource_id` against `api`, converging
/// its membership to `desired`.
///
/// Adds are issued before removes. If both are needed and the second call
/// fails after the first succeeded, the pass fails with
/// [`Error::PartialApply`] naming which half landed; remote state is then in
/// a mixed position that the next pass will converge.
pub async fn reconcile<R, A>(
    api: &A,
    resource_id: &str,
    desired: &BTreeSet<String>,
) -> Result<ReconcileReport<R>>
where
    R: MembershipResource,
    A: ArrayApi<R> + ?Sized,
{
    let started_at = Utc::now();
    let mut transitions = vec![ReconcileState::PlanningRead];
    let kind = R::collection();

    let current = api
        .get(resource_id)
        .await
        .map_err(|e| fail(kind, resource_id, "planning read", &mut transitions, e))?;
    let observed = current.member_ids();

    transitions.push(ReconcileState::Diffing);
    let plan = diff(desired, &observed);
    debug!(
        kind,
        resource_id,
        to_add = plan.to_add.len(),
        to_remove = plan.to_remove.len(),
        "computed plan"
    );

    if plan.is_empty() {
        // Already converged; skip both the mutating calls and the verify
        // round trip.
        transitions.push(ReconcileState::Done);
        info!(kind, resource_id, "membership already converged");
        return Ok(ReconcileReport {
            resource_id: resource_id.to_string(),
            plan,
            transitions,
            refreshed: current,
            started_at,
            finished_at: Utc::now(),
        });
    }

    transitions.push(ReconcileState::Applying);
    let added = !plan.to_add.is_empty();
    if added {
        api.add_members(resource_id, &plan.to_add)
            .await
            .map_err(|e| fail(kind, resource_id, "add_members", &mut transitions, e))?;
    }
    if !plan.to_remove.is_empty() {
        if let Err(e) = api.remove_members(resource_id, &plan.to_remove).await {
            let e = if added {
                Error::PartialApply {
                    resource: format!("{}/{}", kind, resource_id),
                    applied: "add_members".into(),
                    failed: "remove_members".into(),
                    source: Box::new(e),
                }
            } else {
                e
            };
            return Err(fail(kind, resource_id, "remove_members", &mut transitions, e));
        }
    }

    transitions.push(ReconcileState::VerifyRead);
    let refreshed = api
        .get(resource_id)
        .await
        .map_err(|e| fail(kind, resource_id, "verify read", &mut transitions, e))?;

    transitions.push(ReconcileState::Done);
    info!(
        kind,
        resource_id,
        added = plan.to_add.len(),
        removed = plan.to_remove.len(),
        "membership reconciled"
    );

    Ok(ReconcileReport {
        resource_id: resource_id.to_string(),
        plan,
        transitions,
        refreshed,
        started_at,
        finished_at: Utc::now(),
    })
}

/// Close out a failing pass: record the `Failed` transition and log the
/// states visited, then hand the error back verbatim.
fn fail(
    kind: &str,
    resource_id: &str,
    step: &str,
    transitions: &mut Vec<ReconcileState>,
    err: Error,
) -> Error {
    transitions.push(ReconcileState::Failed);
    warn!(
        kind,
        resource_id,
        step,
        states = ?transitions,
        error = %err,
        "reconciliation pass failed"
    );
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fake::{FakeArray, FakeOp};
    use crate::domain::ports::Member;
    use crate::reconcile::differ::desired_set;
    use crate::resources::{HostGroup, VolumeGroup};
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_reconcile_converges_and_second_pass_is_empty() {
        let fake: FakeArray<HostGroup> = FakeArray::new();
        fake.insert("hg-1", "app-hosts", &["h2", "h3"]).await;
        let desired = desired_set(["h1", "h2"]);

        let report = reconcile(&fake, "hg-1", &desired).await.unwrap();
        assert_eq!(report.plan.to_add, vec!["h1"]);
        assert_eq!(report.plan.to_remove, vec!["h3"]);
        assert_eq!(report.refreshed.member_ids(), desired);
        assert_eq!(
            report.transitions,
            vec![
                ReconcileState::PlanningRead,
                ReconcileState::Diffing,
                ReconcileState::Applying,
                ReconcileState::VerifyRead,
                ReconcileState::Done,
            ]
        );

        let second = reconcile(&fake, "hg-1", &desired).await.unwrap();
        assert!(second.converged_without_changes());
    }

    #[tokio::test]
    async fn test_converged_pass_short_circuits_without_mutations() {
        let fake: FakeArray<HostGroup> = FakeArray::new();
        fake.insert("hg-1", "app-hosts", &["h1", "h2"]).await;

        // If the orchestrator issued any mutation these would trip it.
        fake.fail_next(FakeOp::AddMembers);

        let report = reconcile(&fake, "hg-1", &desired_set(["h1", "h2"]))
            .await
            .unwrap();
        assert!(report.converged_without_changes());
        assert_eq!(
            report.transitions,
            vec![
                ReconcileState::PlanningRead,
                ReconcileState::Diffing,
                ReconcileState::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_desired_removes_all_members() {
        let fake: FakeArray<VolumeGroup> = FakeArray::new();
        fake.insert("vg-1", "data", &["v1", "v2"]).await;

        let report = reconcile(&fake, "vg-1", &BTreeSet::new()).await.unwrap();
        assert_eq!(report.plan.to_remove, vec!["v1", "v2"]);
        assert!(report.refreshed.member_ids().is_empty());
    }

    #[tokio::test]
    async fn test_partial_apply_is_reported_explicitly() {
        let fake: FakeArray<HostGroup> = FakeArray::new();
        fake.insert("hg-1", "app-hosts", &["h3"]).await;
        fake.fail_next(FakeOp::RemoveMembers);

        let err = reconcile(&fake, "hg-1", &desired_set(["h1"]))
            .await
            .unwrap_err();
        assert_matches!(
            err,
            Error::PartialApply { ref resource, ref applied, ref failed, .. }
                if resource == "host_group/hg-1"
                    && applied == "add_members"
                    && failed == "remove_members"
        );

        // the add half landed; the stale member is still there
        let ids = fake.get("hg-1").await.unwrap().member_ids();
        assert!(ids.contains("h1"));
        assert!(ids.contains("h3"));
    }

    #[tokio::test]
    async fn test_remove_only_failure_is_not_partial_apply() {
        let fake: FakeArray<HostGroup> = FakeArray::new();
        fake.insert("hg-1", "app-hosts", &["h1", "h3"]).await;
        fake.fail_next(FakeOp::RemoveMembers);

        // nothing to add, so the remove failure propagates verbatim
        let err = reconcile(&fake, "hg-1", &desired_set(["h1"]))
            .await
            .unwrap_err();
        assert_matches!(err, Error::ApiServer { status: 500, .. });
    }

    #[tokio::test]
    async fn test_planning_read_failure_propagates_verbatim() {
        let fake: FakeArray<HostGroup> = FakeArray::new();
        fake.insert("hg-1", "app-hosts", &[]).await;
        fake.fail_next(FakeOp::Get);

        let err = reconcile(&fake, "hg-1", &desired_set(["h1"]))
            .await
            .unwrap_err();
        assert_matches!(err, Error::ApiServer { status: 500, .. });
    }

    #[test]
    fn test_failing_step_records_failed_transition() {
        let mut transitions = vec![ReconcileState::PlanningRead, ReconcileState::Diffing];
        let err = fail(
            "host_group",
            "hg-1",
            "add_members",
            &mut transitions,
            Error::ApiServer {
                status: 500,
                body: "internal".into(),
            },
        );
        assert_eq!(transitions.last(), Some(&ReconcileState::Failed));
        // the classified error passes through untouched
        assert_matches!(err, Error::ApiServer { status: 500, .. });
    }

    #[tokio::test]
    async fn test_secondary_attributes_survive_for_retained_members() {
        let fake: FakeArray<VolumeGroup> = FakeArray::new();
        let mut mapped = Member::new("v1");
        mapped.logical_unit_number = Some(7);
        fake.insert_members("vg-1", "data", vec![mapped]).await;

        let report = reconcile(&fake, "vg-1", &desired_set(["v1", "v2"]))
            .await
            .unwrap();
        let v1 = report
            .refreshed
            .members()
            .iter()
            .find(|m| m.id == "v1")
            .unwrap();
        assert_eq!(v1.logical_unit_number, Some(7));
    }
}
