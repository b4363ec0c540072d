//! Protection policy descriptor
//!
//! A protection policy bundles snapshot rules (and optionally replication
//! rules) applied to volumes and volume groups. The reconciled membership is
//! the snapshot-rule set, mutated through a PATCH on the policy; replication
//! rules ride along as read-only attributes here since their semantics live
//! inside the array.

use crate::domain::ports::{ApiCall, Member, MembershipResource};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A protection policy as returned by `GET /policy/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionPolicy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Snapshot rules attached to the policy
    #[serde(default)]
    pub snapshot_rules: Vec<Member>,
    /// Replication rules, observed but not reconciled
    #[serde(default)]
    pub replication_rules: Vec<Member>,
}

impl MembershipResource for ProtectionPolicy {
    fn collection() -> &'static str {
        "policy"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn members(&self) -> &[Member] {
        &self.snapshot_rules
    }

    fn add_members_call(id: &str, members: &[String]) -> ApiCall {
        ApiCall {
            method: Method::PATCH,
            path: format!("policy/{}", id),
            body: json!({ "add_snapshot_rule_ids": members }),
        }
    }

    fn remove_members_call(id: &str, members: &[String]) -> ApiCall {
        ApiCall {
            method: Method::PATCH,
            path: format!("policy/{}", id),
            body: json!({ "remove_snapshot_rule_ids": members }),
        }
    }

    fn from_parts(id: &str, name: &str, members: Vec<Member>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            snapshot_rules: members,
            replication_rules: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_calls_patch_the_policy() {
        let add = ProtectionPolicy::add_members_call("pp-1", &["sr-1".into()]);
        assert_eq!(add.method, Method::PATCH);
        assert_eq!(add.path, "policy/pp-1");
        assert_eq!(add.body["add_snapshot_rule_ids"], json!(["sr-1"]));
    }

    #[test]
    fn test_replication_rules_are_not_members() {
        let policy: ProtectionPolicy = serde_json::from_value(json!({
            "id": "pp-1",
            "name": "gold",
            "snapshot_rules": [{"id": "sr-1"}],
            "replication_rules": [{"id": "rr-1"}]
        }))
        .unwrap();
        assert!(policy.member_ids().contains("sr-1"));
        assert!(!policy.member_ids().contains("rr-1"));
    }
}
