//! Domain Ports - Core trait definitions for the reconciler
//!
//! These traits define the boundary between reconciliation logic and the
//! array's management API. `MembershipResource` is implemented by each typed
//! resource descriptor; `ArrayApi` is the remote-system capability the
//! orchestrator drives, implemented over HTTP for a live array and in memory
//! for deterministic tests.

use crate::error::Result;
use crate::filter::CompiledFilter;
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// Membership
// =============================================================================

/// One member of a membership-bearing resource as observed on the array.
///
/// Carries secondary attributes (currently the SCSI logical unit number for
/// mapped volumes) that must survive reconciliation for members present in
/// both the desired and observed sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_unit_number: Option<i64>,
}

impl Member {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            logical_unit_number: None,
        }
    }
}

// =============================================================================
// API Call
// =============================================================================

/// A single wire-level operation against the array: method, path relative to
/// the API root, and a JSON body.
#[derive(Debug, Clone)]
pub struct ApiCall {
    pub method: Method,
    pub path: String,
    pub body: serde_json::Value,
}

// =============================================================================
// Membership Resource
// =============================================================================

/// A typed resource descriptor whose relationship to other resources is
/// declared as a member-ID set.
///
/// Implementations describe both the read side (how members appear on the
/// resource) and the write side (the exact call that mutates membership),
/// because the array is not uniform: host groups take a PATCH with
/// `add_host_ids`/`remove_host_ids`, volume groups take dedicated
/// `add_members`/`remove_members` POST endpoints.
pub trait MembershipResource:
    Clone + Send + Sync + Serialize + for<'de> Deserialize<'de> + 'static
{
    /// URL collection segment, e.g. `host_group`
    fn collection() -> &'static str;

    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// The membership-bearing field, observed fresh on every pass
    fn members(&self) -> &[Member];

    /// Deduplicated member IDs, the input to the differ
    fn member_ids(&self) -> BTreeSet<String> {
        self.members().iter().map(|m| m.id.clone()).collect()
    }

    /// The wire call that attaches `members` to the resource
    fn add_members_call(id: &str, members: &[String]) -> ApiCall;

    /// The wire call that detaches `members` from the resource
    fn remove_members_call(id: &str, members: &[String]) -> ApiCall;

    /// Construct a descriptor from raw parts. Used by the in-memory fake and
    /// by tests; live descriptors come from the array's JSON.
    fn from_parts(id: &str, name: &str, members: Vec<Member>) -> Self;
}

// =============================================================================
// Array API Capability
// =============================================================================

/// The remote-system capability the orchestrator reconciles against.
///
/// One implementor speaks HTTP to a live array; [`crate::domain::FakeArray`]
/// keeps membership in memory so differ and orchestrator behavior can be
/// tested without an endpoint. All calls are cancellable by dropping the
/// future; the HTTP implementor additionally bounds each call with the
/// client's configured timeout.
#[async_trait]
pub trait ArrayApi<R: MembershipResource>: Send + Sync {
    /// List resources matching a compiled filter
    async fn list(&self, filter: &CompiledFilter) -> Result<Vec<R>>;

    /// Fetch one resource by ID
    async fn get(&self, id: &str) -> Result<R>;

    /// Attach members to a resource
    async fn add_members(&self, id: &str, members: &[String]) -> Result<()>;

    /// Detach members from a resource
    async fn remove_members(&self, id: &str, members: &[String]) -> Result<()>;
}
