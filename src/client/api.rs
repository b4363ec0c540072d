//! HTTP implementation of the array capability
//!
//! Bridges a typed [`MembershipResource`] descriptor onto the wire: list and
//! get deserialize the array's JSON, membership mutations send the calls the
//! descriptor defines.

use crate::client::ArrayClient;
use crate::domain::ports::{ArrayApi, MembershipResource};
use crate::error::Result;
use crate::filter::CompiledFilter;
use async_trait::async_trait;
use reqwest::Method;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// [`ArrayApi`] implementor speaking HTTP to a live array
pub struct HttpArrayApi<R> {
    client: Arc<ArrayClient>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: MembershipResource> HttpArrayApi<R> {
    pub fn new(client: Arc<ArrayClient>) -> Self {
        Self {
            client,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<R: MembershipResource> ArrayApi<R> for HttpArrayApi<R> {
    async fn list(&self, filter: &CompiledFilter) -> Result<Vec<R>> {
        let values = self.client.get_paginated(R::collection(), filter).await?;
        debug!(
            collection = R::collection(),
            count = values.len(),
            "listed resources"
        );
        values
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(Into::into))
            .collect()
    }

    async fn get(&self, id: &str) -> Result<R> {
        let path = format!("{}/{}", R::collection(), id);
        let body = self.client.execute(Method::GET, &path, &[], None).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn add_members(&self, id: &str, members: &[String]) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        let call = R::add_members_call(id, members);
        self.client
            .execute(call.method, &call.path, &[], Some(&call.body))
            .await?;
        Ok(())
    }

    async fn remove_members(&self, id: &str, members: &[String]) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        let call = R::remove_members_call(id, members);
        self.client
            .execute(call.method, &call.path, &[], Some(&call.body))
            .await?;
        Ok(())
    }
}
