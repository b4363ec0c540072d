//! Volume group descriptor
//!
//! Volume groups expose dedicated membership endpoints: `POST
//! /volume_group/{id}/add_members` and `.../remove_members`, each taking a
//! `volume_ids` list. Mapped volumes can carry a logical unit number, which
//! the reconciler preserves for members present in both sets by re-reading
//! canonical state after every apply.

use crate::domain::ports::{ApiCall, Member, MembershipResource};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A volume group as returned by `GET /volume_group/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_write_order_consistent: bool,
    /// Volumes currently in the group
    #[serde(default)]
    pub volumes: Vec<Member>,
}

impl MembershipResource for VolumeGroup {
    fn collection() -> &'static str {
        "volume_group"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn members(&self) -> &[Member] {
        &self.volumes
    }

    fn add_members_call(id: &str, members: &[String]) -> ApiCall {
        ApiCall {
            method: Method::POST,
            path: format!("volume_group/{}/add_members", id),
            body: json!({ "volume_ids": members }),
        }
    }

    fn remove_members_call(id: &str, members: &[String]) -> ApiCall {
        ApiCall {
            method: Method::POST,
            path: format!("volume_group/{}/remove_members", id),
            body: json!({ "volume_ids": members }),
        }
    }

    fn from_parts(id: &str, name: &str, members: Vec<Member>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            is_write_order_consistent: false,
            volumes: members,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_calls_use_dedicated_endpoints() {
        let add = VolumeGroup::add_members_call("vg-1", &["v1".into()]);
        assert_eq!(add.method, Method::POST);
        assert_eq!(add.path, "volume_group/vg-1/add_members");
        assert_eq!(add.body, json!({ "volume_ids": ["v1"] }));

        let remove = VolumeGroup::remove_members_call("vg-1", &["v2".into()]);
        assert_eq!(remove.path, "volume_group/vg-1/remove_members");
    }

    #[test]
    fn test_logical_unit_number_survives_deserialization() {
        let group: VolumeGroup = serde_json::from_value(json!({
            "id": "vg-1",
            "name": "data",
            "volumes": [{"id": "v1", "logical_unit_number": 4}]
        }))
        .unwrap();
        assert_eq!(group.volumes[0].logical_unit_number, Some(4));
    }
}
