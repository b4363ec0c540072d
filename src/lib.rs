//! Array Reconciler - Declarative state for storage-array REST APIs
//!
//! Keeps declared infrastructure configuration (host groups, volume groups,
//! protection policies) synchronized with the live state of a storage array's
//! management API.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Reconciliation Orchestrator                   │
//! │        PlanningRead → Diffing → Applying → VerifyRead         │
//! ├──────────────────┬────────────────────┬──────────────────────┤
//! │  Relationship    │  Filter Expression │   Request Executor   │
//! │  Differ          │  Compiler          │   / Classifier       │
//! │  (pure set diff) │  (field=op.value)  │   (method→status)    │
//! ├──────────────────┴────────────────────┴──────────────────────┤
//! │          Typed resource descriptors (ArrayApi port)          │
//! │     host_group  │  volume_group  │  protection_policy        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`reconcile`]: differ and pass orchestrator
//! - [`filter`]: filter expression compiler
//! - [`client`]: HTTP executor and response classifier
//! - [`resources`]: typed membership-bearing resource descriptors
//! - [`domain`]: ports ([`ArrayApi`], [`MembershipResource`]) and the
//!   in-memory fake
//! - [`state`]: declared desired-state file
//! - [`error`]: error taxonomy

pub mod client;
pub mod domain;
pub mod error;
pub mod filter;
pub mod reconcile;
pub mod resources;
pub mod state;

// Re-export commonly used types
pub use client::{ArrayClient, ClientConfig, HttpArrayApi, RequestOutcome};
pub use domain::{ApiCall, ArrayApi, FakeArray, Member, MembershipResource};
pub use error::{Error, Result};
pub use filter::{CompiledFilter, FilterClause, FilterOperator};
pub use reconcile::{diff, reconcile, ReconcileReport, ReconcileState, ReconciliationPlan};
pub use resources::{HostGroup, ProtectionPolicy, VolumeGroup};
pub use state::{DeclaredResource, DeclaredState, ResourceKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
