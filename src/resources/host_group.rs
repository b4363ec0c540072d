//! Host group descriptor
//!
//! A host group aggregates hosts so volumes can be mapped to all of them at
//! once. Membership is mutated through a PATCH on the group carrying
//! `add_host_ids` / `remove_host_ids`.

use crate::domain::ports::{ApiCall, Member, MembershipResource};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A host group as returned by `GET /host_group/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Hosts currently attached to the group
    #[serde(default)]
    pub hosts: Vec<Member>,
}

impl MembershipResource for HostGroup {
    fn collection() -> &'static str {
        "host_group"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn members(&self) -> &[Member] {
        &self.hosts
    }

    fn add_members_call(id: &str, members: &[String]) -> ApiCall {
        ApiCall {
            method: Method::PATCH,
            path: format!("host_group/{}", id),
            body: json!({ "add_host_ids": members }),
        }
    }

    fn remove_members_call(id: &str, members: &[String]) -> ApiCall {
        ApiCall {
            method: Method::PATCH,
            path: format!("host_group/{}", id),
            body: json!({ "remove_host_ids": members }),
        }
    }

    fn from_parts(id: &str, name: &str, members: Vec<Member>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            hosts: members,
        }
    }
}
