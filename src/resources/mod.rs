//! Typed resource descriptors
//!
//! One module per membership-bearing resource kind on the array. Each
//! descriptor mirrors the wire JSON of its kind and implements
//! [`crate::domain::MembershipResource`], so reconciliation logic never sees
//! stringly-typed attribute maps.

pub mod host_group;
pub mod protection_policy;
pub mod volume_group;

pub use host_group::HostGroup;
pub use protection_policy::ProtectionPolicy;
pub use volume_group::VolumeGroup;
