//! Declared desired state
//!
//! The YAML file consumed by `arrayctl`, mapping each declared resource to
//! its member IDs:
//!
//! ```yaml
//! resources:
//!   - kind: host_group
//!     name: app-hosts
//!     members: [h-1, h-2]
//!   - kind: volume_group
//!     id: vg-77
//!     name: data
//!     members: [v-1]
//! ```
//!
//! Desired membership is rebuilt from this file on every pass; nothing here
//! is cached against the array.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Resource kinds with reconcilable membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    HostGroup,
    VolumeGroup,
    ProtectionPolicy,
}

impl ResourceKind {
    /// The array's URL collection segment for this kind. Protection policies
    /// live at `policy` on the wire even though the declared tag spells the
    /// kind out.
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::HostGroup => "host_group",
            ResourceKind::VolumeGroup => "volume_group",
            ResourceKind::ProtectionPolicy => "policy",
        }
    }
}

// Diagnostics display the wire path, the same name the executor logs, so a
// resource is never named two different ways in operator output.
impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

/// One declared resource and its target membership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclaredResource {
    pub kind: ResourceKind,
    /// Array-assigned ID; when absent the resource is located by name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Declared member IDs; order and duplicates carry no meaning
    #[serde(default)]
    pub members: Vec<String>,
}

/// The full declared configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeclaredState {
    #[serde(default)]
    pub resources: Vec<DeclaredResource>,
}

impl DeclaredState {
    /// Parse declared state from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        let state: DeclaredState = serde_yaml::from_str(text)?;
        state.validate()?;
        Ok(state)
    }

    /// Load declared state from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    fn validate(&self) -> Result<()> {
        for resource in &self.resources {
            if resource.name.is_empty() {
                return Err(crate::error::Error::Configuration(format!(
                    "declared {} has an empty name",
                    resource.kind
                )));
            }
        }
        Ok(())
    }
}
