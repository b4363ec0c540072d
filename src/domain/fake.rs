//! In-memory array fake
//!
//! A deterministic [`ArrayApi`] implementation backed by a `BTreeMap`, used
//! by the orchestrator and differ tests instead of a live endpoint. Supports
//! one-shot failure injection so partial-apply paths can be exercised.

use crate::domain::ports::{ArrayApi, Member, MembershipResource};
use crate::error::{Error, Result};
use crate::filter::CompiledFilter;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Mutex;
use tokio::sync::RwLock;

/// Operations that can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeOp {
    List,
    Get,
    AddMembers,
    RemoveMembers,
}

#[derive(Debug, Clone)]
struct FakeEntry {
    name: String,
    members: Vec<Member>,
}

/// In-memory stand-in for one resource collection on the array
pub struct FakeArray<R> {
    entries: RwLock<BTreeMap<String, FakeEntry>>,
    fail_once: Mutex<Option<FakeOp>>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: MembershipResource> FakeArray<R> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            fail_once: Mutex::new(None),
            _marker: PhantomData,
        }
    }

    /// Seed a resource with the given membership
    pub async fn insert(&self, id: &str, name: &str, member_ids: &[&str]) {
        let members = member_ids.iter().map(|m| Member::new(*m)).collect();
        self.entries.write().await.insert(
            id.to_string(),
            FakeEntry {
                name: name.to_string(),
                members,
            },
        );
    }

    /// Seed a resource with full member records (secondary attributes kept)
    pub async fn insert_members(&self, id: &str, name: &str, members: Vec<Member>) {
        self.entries.write().await.insert(
            id.to_string(),
            FakeEntry {
                name: name.to_string(),
                members,
            },
        );
    }

    /// Make the next invocation of `op` fail with a 500
    pub fn fail_next(&self, op: FakeOp) {
        *self.fail_once.lock().unwrap() = Some(op);
    }

    /// Current raw membership of a resource, for assertions
    pub async fn members_of(&self, id: &str) -> Vec<Member> {
        self.entries
            .read()
            .await
            .get(id)
            .map(|e| e.members.clone())
            .unwrap_or_default()
    }

    fn check_failure(&self, op: FakeOp) -> Result<()> {
        let mut slot = self.fail_once.lock().unwrap();
        if *slot == Some(op) {
            *slot = None;
            return Err(Error::ApiServer {
                status: 500,
                body: format!("injected failure on {:?}", op),
            });
        }
        Ok(())
    }

    fn build(id: &str, entry: &FakeEntry) -> R {
        R::from_parts(id, &entry.name, entry.members.clone())
    }
}

impl<R: MembershipResource> Default for FakeArray<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: MembershipResource> ArrayApi<R> for FakeArray<R> {
    async fn list(&self, filter: &CompiledFilter) -> Result<Vec<R>> {
        self.check_failure(FakeOp::List)?;
        let entries = self.entries.read().await;
        let wanted_name = filter
            .get("name")
            .and_then(|v| v.strip_prefix("eq."))
            .map(str::to_string);
        Ok(entries
            .iter()
            .filter(|(_, e)| match &wanted_name {
                Some(name) => e.name == *name,
                None => true,
            })
            .map(|(id, e)| Self::build(id, e))
            .collect())
    }

    async fn get(&self, id: &str) -> Result<R> {
        self.check_failure(FakeOp::Get)?;
        let entries = self.entries.read().await;
        let entry = entries.get(id).ok_or_else(|| Error::ApiClient {
            status: 404,
            body: format!("instance {} not found", id),
        })?;
        Ok(Self::build(id, entry))
    }

    async fn add_members(&self, id: &str, members: &[String]) -> Result<()> {
        self.check_failure(FakeOp::AddMembers)?;
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(id).ok_or_else(|| Error::ApiClient {
            status: 404,
            body: format!("instance {} not found", id),
        })?;
        for m in members {
            if !entry.members.iter().any(|existing| existing.id == *m) {
                entry.members.push(Member::new(m.clone()));
            }
        }
        Ok(())
    }

    async fn remove_members(&self, id: &str, members: &[String]) -> Result<()> {
        self.check_failure(FakeOp::RemoveMembers)?;
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(id).ok_or_else(|| Error::ApiClient {
            status: 404,
            body: format!("instance {} not found", id),
        })?;
        entry.members.retain(|m| !members.contains(&m.id));
        Ok(())
    }
}
