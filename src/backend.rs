//! HTTP client for the remote content backend (BaaS edge functions).
//!
//! The client is constructed explicitly and passed where needed; there is
//! no process-wide singleton, so tests can inject a fake through the
//! `ContentBackend` trait.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::feed::SortOrder;

/// Remote endpoints, one per content kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Articles,
    Poems,
    PhotoJournals,
    Projects,
    Uses,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Articles => "get-articles",
            Endpoint::Poems => "get-poems",
            Endpoint::PhotoJournals => "get-photos",
            Endpoint::Projects => "get-projects",
            Endpoint::Uses => "get-uses",
        }
    }

    /// Cache namespace for this endpoint's list payload.
    pub fn cache_key(self) -> &'static str {
        match self {
            Endpoint::Articles => "content|articles",
            Endpoint::Poems => "content|poems",
            Endpoint::PhotoJournals => "content|journals",
            Endpoint::Projects => "content|projects",
            Endpoint::Uses => "content|uses",
        }
    }
}

#[async_trait]
pub trait ContentBackend: Send + Sync {
    /// Fetch the full list for an endpoint as raw JSON.
    async fn fetch_list(&self, endpoint: Endpoint) -> Result<Value>;
    /// Fetch one item by slug as raw JSON.
    async fn fetch_item(&self, endpoint: Endpoint, slug: &str) -> Result<Value>;
    /// Fetch one window of the photo/video feed as raw JSON.
    async fn fetch_feed(&self, order: SortOrder, limit: usize, offset: usize) -> Result<Value>;
}

pub struct HttpBackend {
    base: Url,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(base: Url) -> Self {
        Self::with_client(base, reqwest::Client::new())
    }

    pub fn with_client(base: Url, client: reqwest::Client) -> Self {
        Self { base, client }
    }

    fn endpoint_url(&self, path: &str) -> String {
        format!("{}/{}", self.base.as_str().trim_end_matches('/'), path)
    }

    async fn get_json(&self, request: reqwest::RequestBuilder, what: &str) -> Result<Value> {
        let res = request.send().await.with_context(|| format!("requesting {what}"))?;
        let status = res.status();
        if !status.is_success() {
            bail!("{what} returned {status}");
        }
        res.json().await.with_context(|| format!("reading {what} body"))
    }
}

#[async_trait]
impl ContentBackend for HttpBackend {
    async fn fetch_list(&self, endpoint: Endpoint) -> Result<Value> {
        let url = self.endpoint_url(endpoint.path());
        self.get_json(self.client.get(&url), endpoint.path()).await
    }

    async fn fetch_item(&self, endpoint: Endpoint, slug: &str) -> Result<Value> {
        let url = self.endpoint_url(endpoint.path());
        let req = self.client.get(&url).query(&[("slug", slug)]);
        self.get_json(req, endpoint.path()).await
    }

    async fn fetch_feed(&self, order: SortOrder, limit: usize, offset: usize) -> Result<Value> {
        let url = self.endpoint_url("get-feed");
        let req = self.client.get(&url).query(&[
            ("order", order.as_str().to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ]);
        self.get_json(req, "get-feed").await
    }
}
