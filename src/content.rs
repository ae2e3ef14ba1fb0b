//! Content service: owns the backend client and the local cache, and
//! applies the error policy the site relies on. List and by-slug fetch
//! failures degrade to empty collections or `None` so pages render an
//! empty state instead of an error; only the feed HTTP route surfaces
//! internal failures, via `feed_page`.

use std::future::Future;
use std::sync::Arc;

use anyhow::{bail, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::backend::{ContentBackend, Endpoint};
use crate::decode;
use crate::feed::{clamp_limit, clamp_offset, FeedPage, SortOrder};
use crate::storage::{current_epoch, Storage};
use crate::types::{is_published, Article, PhotoJournal, Poem, Project, UsesCategory};

/// Site paths accepted by the revalidation endpoint.
pub const ALLOWED_PATHS: &[&str] = &["/", "/articles", "/poems", "/projects", "/photos"];

pub fn is_allowed_path(path: &str) -> bool {
    ALLOWED_PATHS.contains(&path)
}

pub struct ContentService {
    backend: Arc<dyn ContentBackend>,
    cache: Arc<dyn Storage>,
    content_ttl_secs: i64,
}

impl ContentService {
    pub fn new(
        backend: Arc<dyn ContentBackend>,
        cache: Arc<dyn Storage>,
        content_ttl_secs: i64,
    ) -> Self {
        Self { backend, cache, content_ttl_secs }
    }

    // --- content lists (cached, degrade to empty) ---

    pub async fn articles(&self) -> Vec<Article> {
        self.cached_list(Endpoint::Articles, self.load_articles()).await
    }

    pub async fn poems(&self) -> Vec<Poem> {
        self.cached_list(Endpoint::Poems, self.load_poems()).await
    }

    pub async fn photo_journals(&self) -> Vec<PhotoJournal> {
        self.cached_list(Endpoint::PhotoJournals, self.load_photo_journals()).await
    }

    pub async fn projects(&self) -> Vec<Project> {
        self.cached_list(Endpoint::Projects, self.load_projects()).await
    }

    pub async fn uses(&self) -> Vec<UsesCategory> {
        self.cached_list(Endpoint::Uses, self.load_uses()).await
    }

    /// Cache envelope shared by the list accessors: serve a fresh cached
    /// payload when one exists, otherwise load from the backend and cache
    /// the typed result. Any failure yields the empty list.
    async fn cached_list<T>(
        &self,
        endpoint: Endpoint,
        load: impl Future<Output = Result<Vec<T>>>,
    ) -> Vec<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let key = endpoint.cache_key();
        let now = current_epoch();
        match self.cache.get_cache(key, now).await {
            Ok(Some(payload)) => {
                if let Ok(list) = serde_json::from_str::<Vec<T>>(&payload) {
                    return list;
                }
                // Stale schema in the cache; fall through to a fresh load.
            }
            Ok(None) => {}
            Err(err) => warn!(key, %err, "cache read failed"),
        }
        match load.await {
            Ok(list) => {
                if let Ok(payload) = serde_json::to_string(&list) {
                    let expires = now + self.content_ttl_secs;
                    if let Err(err) = self.cache.put_cache(key, &payload, expires).await {
                        warn!(key, %err, "cache write failed");
                    }
                }
                list
            }
            Err(err) => {
                warn!(endpoint = endpoint.path(), %err, "content list fetch failed");
                Vec::new()
            }
        }
    }

    async fn load_articles(&self) -> Result<Vec<Article>> {
        let raw = self.backend.fetch_list(Endpoint::Articles).await?;
        let mut list: Vec<Article> = decode::list_items(&raw, &["articles", "items"])?
            .iter()
            .map(decode::article)
            .collect::<Result<_, _>>()?;
        list.retain(|a| is_published(&a.published));
        list.sort_by(|a, z| z.date.cmp(&a.date));
        Ok(list)
    }

    async fn load_poems(&self) -> Result<Vec<Poem>> {
        let raw = self.backend.fetch_list(Endpoint::Poems).await?;
        let mut list: Vec<Poem> = decode::list_items(&raw, &["poems", "items"])?
            .iter()
            .map(decode::poem)
            .collect::<Result<_, _>>()?;
        list.retain(|p| is_published(&p.published));
        list.sort_by(|a, z| z.date.cmp(&a.date));
        Ok(list)
    }

    async fn load_photo_journals(&self) -> Result<Vec<PhotoJournal>> {
        let raw = self.backend.fetch_list(Endpoint::PhotoJournals).await?;
        let mut list: Vec<PhotoJournal> =
            decode::list_items(&raw, &["photo_journals", "albums", "items"])?
                .iter()
                .map(decode::photo_journal)
                .collect::<Result<_, _>>()?;
        list.retain(|j| is_published(&j.published));
        // Journals read oldest-first, unlike articles and poems.
        list.sort_by(|a, z| a.date.cmp(&z.date));
        Ok(list)
    }

    async fn load_projects(&self) -> Result<Vec<Project>> {
        let raw = self.backend.fetch_list(Endpoint::Projects).await?;
        decode::list_items(&raw, &["projects", "items"])?
            .iter()
            .map(|v| decode::project(v).map_err(Into::into))
            .collect()
    }

    async fn load_uses(&self) -> Result<Vec<UsesCategory>> {
        let raw = self.backend.fetch_list(Endpoint::Uses).await?;
        Ok(decode::uses_categories(&raw)?)
    }

    // --- single items (uncached, degrade to None) ---

    pub async fn article_by_slug(&self, slug: &str) -> Option<Article> {
        let raw = self.fetch_item(Endpoint::Articles, slug).await?;
        let item = Self::item_or_warn(&raw, &["article"], slug)?;
        let mut article = Self::decode_or_warn(decode::article(item), slug)?;
        article.content = Some(decode::content_body(item));
        Some(article)
    }

    pub async fn poem_by_slug(&self, slug: &str) -> Option<Poem> {
        let raw = self.fetch_item(Endpoint::Poems, slug).await?;
        let item = Self::item_or_warn(&raw, &["poem"], slug)?;
        let mut poem = Self::decode_or_warn(decode::poem(item), slug)?;
        poem.content = Some(decode::content_body(item));
        Some(poem)
    }

    pub async fn photo_journal_by_slug(&self, slug: &str) -> Option<PhotoJournal> {
        let raw = self.fetch_item(Endpoint::PhotoJournals, slug).await?;
        let item = Self::item_or_warn(&raw, &["photo_journal", "album"], slug)?;
        let mut journal = Self::decode_or_warn(decode::photo_journal(item), slug)?;
        journal.content = Some(decode::content_body(item));
        Some(journal)
    }

    pub async fn project_by_slug(&self, slug: &str) -> Option<Project> {
        let raw = self.fetch_item(Endpoint::Projects, slug).await?;
        let item = Self::item_or_warn(&raw, &["project"], slug)?;
        Self::decode_or_warn(decode::project(item), slug)
    }

    async fn fetch_item(&self, endpoint: Endpoint, slug: &str) -> Option<Value> {
        match self.backend.fetch_item(endpoint, slug).await {
            Ok(raw) => Some(raw),
            Err(err) => {
                warn!(endpoint = endpoint.path(), slug, %err, "item fetch failed");
                None
            }
        }
    }

    fn item_or_warn<'a>(raw: &'a Value, wrappers: &[&str], slug: &str) -> Option<&'a Value> {
        match decode::unwrap_item(raw, wrappers) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(slug, %err, "item response malformed");
                None
            }
        }
    }

    fn decode_or_warn<T>(result: Result<T, decode::DecodeError>, slug: &str) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(err) => {
                warn!(slug, %err, "item decode failed");
                None
            }
        }
    }

    // --- feed ---

    /// One window of the feed. Limit is clamped to [1, 100], offset to >= 0.
    /// Errors propagate so the HTTP route can answer 500.
    pub async fn feed_page(&self, order: SortOrder, limit: i64, offset: i64) -> Result<FeedPage> {
        let limit = clamp_limit(limit);
        let offset = clamp_offset(offset);
        let raw = self.backend.fetch_feed(order, limit, offset).await?;
        Ok(decode::feed_page(&raw, limit)?)
    }

    /// The fetcher contract the feed view relies on: any failure degrades
    /// to an empty page with no continuation. No retries.
    pub async fn feed_page_or_empty(&self, order: SortOrder, limit: i64, offset: i64) -> FeedPage {
        match self.feed_page(order, limit, offset).await {
            Ok(page) => page,
            Err(err) => {
                warn!(order = order.as_str(), %err, "feed page fetch failed");
                FeedPage::empty()
            }
        }
    }

    // --- revalidation ---

    /// Invalidate the cache entries behind an allow-listed site path.
    /// Returns the number of dropped cache entries.
    pub async fn revalidate(&self, path: &str) -> Result<u64> {
        let prefix = match path {
            "/" => None,
            "/articles" => Some(Endpoint::Articles.cache_key()),
            "/poems" => Some(Endpoint::Poems.cache_key()),
            "/projects" => Some(Endpoint::Projects.cache_key()),
            "/photos" => Some(Endpoint::PhotoJournals.cache_key()),
            other => bail!("path not in allow-list: {other}"),
        };
        self.cache.delete_prefix(prefix).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::backend::{ContentBackend, Endpoint};
    use crate::feed::SortOrder;
    use crate::storage::Storage;

    /// In-memory backend: canned responses per endpoint, or global failure.
    #[derive(Default)]
    pub struct FakeBackend {
        pub lists: Mutex<HashMap<&'static str, Value>>,
        pub items: Mutex<HashMap<String, Value>>,
        pub feed: Mutex<Option<Value>>,
        pub fail: std::sync::atomic::AtomicBool,
        pub calls: AtomicUsize,
    }

    impl FakeBackend {
        pub fn with_list(self, endpoint: Endpoint, value: Value) -> Self {
            self.lists.lock().unwrap().insert(endpoint.path(), value);
            self
        }

        pub fn with_feed(self, value: Value) -> Self {
            *self.feed.lock().unwrap() = Some(value);
            self
        }

        pub fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn check(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                bail!("backend unreachable");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ContentBackend for FakeBackend {
        async fn fetch_list(&self, endpoint: Endpoint) -> Result<Value> {
            self.check()?;
            match self.lists.lock().unwrap().get(endpoint.path()) {
                Some(v) => Ok(v.clone()),
                None => bail!("{} returned 404", endpoint.path()),
            }
        }

        async fn fetch_item(&self, endpoint: Endpoint, slug: &str) -> Result<Value> {
            self.check()?;
            let key = format!("{}|{}", endpoint.path(), slug);
            match self.items.lock().unwrap().get(&key) {
                Some(v) => Ok(v.clone()),
                None => bail!("{} returned 404", endpoint.path()),
            }
        }

        async fn fetch_feed(&self, _order: SortOrder, limit: usize, offset: usize) -> Result<Value> {
            self.check()?;
            match self.feed.lock().unwrap().clone() {
                Some(v) => Ok(v),
                // Default: synthesize `limit` rows starting at `offset`.
                None => {
                    let rows: Vec<Value> = (offset..offset + limit)
                        .map(|i| {
                            json!({
                                "id": i.to_string(),
                                "src": format!("https://cdn.example.com/{i}.jpg"),
                                "photo_date": "2024-01-01"
                            })
                        })
                        .collect();
                    Ok(json!({ "data": rows, "hasMore": true }))
                }
            }
        }
    }

    /// In-memory storage with the same contract as the SQLite cache.
    #[derive(Default)]
    pub struct MemoryStorage {
        pub entries: Mutex<HashMap<String, (String, i64)>>,
    }

    #[async_trait]
    impl Storage for MemoryStorage {
        async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(key)
                .filter(|(_, exp)| *exp > now)
                .map(|(payload, _)| payload.clone()))
        }

        async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), (payload.to_string(), expires_at));
            Ok(())
        }

        async fn delete_prefix(&self, prefix: Option<&str>) -> Result<u64> {
            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            match prefix {
                Some(p) => entries.retain(|k, _| !k.starts_with(p)),
                None => entries.clear(),
            }
            Ok((before - entries.len()) as u64)
        }
    }
}
