//! Lazy, category-scoped catalog cache.
//!
//! Providers routinely carry tens of thousands of VOD/series entries, so items
//! are only ever fetched one category at a time and memoized per
//! `(ContentKind, category_id)`. Concurrent requests for a key that is still
//! loading share a single remote fetch.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::models::{CatalogItem, Category, ContentKind, SeriesDetail};
use crate::services::remote::CatalogApi;

type SharedFetch<V> = Shared<BoxFuture<'static, CatalogResult<Arc<V>>>>;

enum Slot<V> {
    Ready(Arc<V>),
    Pending { ticket: u64, fetch: SharedFetch<V> },
}

/// Memo table whose misses are coalesced into one spawned fetch per key.
///
/// The fetch runs on its own task, so it completes (and fills the slot) even
/// when every waiter has given up.
struct CoalescingMap<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
    next_ticket: AtomicU64,
}

impl<K, V> CoalescingMap<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Cached value, or a handle on the in-flight fetch for `key`
    async fn lookup<F, Fut>(self: &Arc<Self>, key: K, fetch: F) -> Result<Arc<V>, SharedFetch<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CatalogResult<V>> + Send + 'static,
    {
        let mut slots = self.slots.lock().await;
        match slots.get(&key) {
            Some(Slot::Ready(value)) => {
                debug!(key = ?key, "Cache hit");
                Ok(Arc::clone(value))
            }
            Some(Slot::Pending { fetch, .. }) => {
                debug!(key = ?key, "Joining in-flight fetch");
                Err(fetch.clone())
            }
            None => {
                debug!(key = ?key, "Cache miss, fetching");
                let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
                let map = Arc::clone(self);
                let task_key = key.clone();
                let pending = fetch();

                let handle = tokio::spawn(async move {
                    let result = pending.await.map(Arc::new);
                    map.settle(task_key, ticket, &result).await;
                    result
                });

                let shared: SharedFetch<V> = async move {
                    match handle.await {
                        Ok(result) => result,
                        Err(e) => Err(CatalogError::from(e)),
                    }
                }
                .boxed()
                .shared();

                slots.insert(
                    key,
                    Slot::Pending {
                        ticket,
                        fetch: shared.clone(),
                    },
                );
                Err(shared)
            }
        }
    }

    async fn get_or_fetch<F, Fut>(self: &Arc<Self>, key: K, fetch: F) -> CatalogResult<Arc<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CatalogResult<V>> + Send + 'static,
    {
        match self.lookup(key, fetch).await {
            Ok(value) => Ok(value),
            Err(pending) => pending.await,
        }
    }

    /// Replace the pending slot with the outcome, unless it was invalidated
    /// or superseded meanwhile. Failures leave the key absent.
    async fn settle(&self, key: K, ticket: u64, result: &CatalogResult<Arc<V>>) {
        let mut slots = self.slots.lock().await;
        let current = matches!(
            slots.get(&key),
            Some(Slot::Pending { ticket: t, .. }) if *t == ticket
        );
        if !current {
            debug!(key = ?key, "Discarding result of invalidated fetch");
            return;
        }
        match result {
            Ok(value) => {
                slots.insert(key, Slot::Ready(Arc::clone(value)));
            }
            Err(e) => {
                warn!(key = ?key, error = %e, "Fetch failed, entry left uncached");
                slots.remove(&key);
            }
        }
    }

    async fn invalidate<P>(&self, predicate: P) -> usize
    where
        P: Fn(&K) -> bool,
    {
        let mut slots = self.slots.lock().await;
        let before = slots.len();
        slots.retain(|k, _| !predicate(k));
        before - slots.len()
    }

    async fn is_ready(&self, key: &K) -> bool {
        matches!(self.slots.lock().await.get(key), Some(Slot::Ready(_)))
    }

    async fn ready_count(&self) -> usize {
        self.slots
            .lock()
            .await
            .values()
            .filter(|s| matches!(s, Slot::Ready(_)))
            .count()
    }
}

/// Composite key of a cached item list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: ContentKind,
    pub category_id: String,
}

impl CacheKey {
    pub fn new(kind: ContentKind, category_id: impl Into<String>) -> Self {
        Self {
            kind,
            category_id: category_id.into(),
        }
    }
}

/// Per-session catalog cache. Sole writer of cached category and item lists.
pub struct CategoryCache {
    api: Arc<dyn CatalogApi>,
    categories: Arc<CoalescingMap<ContentKind, Vec<Category>>>,
    items: Arc<CoalescingMap<CacheKey, Vec<CatalogItem>>>,
    series: Arc<CoalescingMap<i64, SeriesDetail>>,
}

impl CategoryCache {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self {
            api,
            categories: Arc::new(CoalescingMap::new()),
            items: Arc::new(CoalescingMap::new()),
            series: Arc::new(CoalescingMap::new()),
        }
    }

    /// Categories of `kind`, fetched once per session until `refresh`
    pub async fn categories(&self, kind: ContentKind) -> CatalogResult<Arc<Vec<Category>>> {
        let api = Arc::clone(&self.api);
        self.categories
            .get_or_fetch(kind, move || async move { api.fetch_categories(kind).await })
            .await
    }

    /// Items of one category, fetched on first use and memoized
    pub async fn items_for_category(
        &self,
        kind: ContentKind,
        category_id: &str,
    ) -> CatalogResult<Arc<Vec<CatalogItem>>> {
        let key = self.item_key(kind, category_id)?;
        let api = Arc::clone(&self.api);
        let category = key.category_id.clone();
        self.items
            .get_or_fetch(key, move || async move {
                api.fetch_items(kind, &category).await
            })
            .await
    }

    /// Like [`items_for_category`](Self::items_for_category), but this caller
    /// stops waiting once `cancel` fires. The shared fetch keeps running for
    /// other waiters and still fills the cache.
    pub async fn items_for_category_cancellable(
        &self,
        kind: ContentKind,
        category_id: &str,
        cancel: &CancellationToken,
    ) -> CatalogResult<Arc<Vec<CatalogItem>>> {
        let key = self.item_key(kind, category_id)?;
        let api = Arc::clone(&self.api);
        let category = key.category_id.clone();
        let lookup = self.items.lookup(key, move || async move {
            api.fetch_items(kind, &category).await
        });

        let pending = tokio::select! {
            _ = cancel.cancelled() => return Err(CatalogError::Cancelled),
            found = lookup => match found {
                Ok(value) => return Ok(value),
                Err(pending) => pending,
            },
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(kind = %kind, category_id, "Caller abandoned category fetch");
                Err(CatalogError::Cancelled)
            }
            result = pending => result,
        }
    }

    /// Series detail with episodes, memoized per series id
    pub async fn series_detail(&self, series_id: i64) -> CatalogResult<Arc<SeriesDetail>> {
        if series_id <= 0 {
            return Err(CatalogError::NotFound(format!("Invalid series id {}", series_id)));
        }
        let api = Arc::clone(&self.api);
        self.series
            .get_or_fetch(series_id, move || async move {
                api.fetch_series_detail(series_id).await
            })
            .await
    }

    /// Drop everything cached for `kind`. In-flight fetches still complete for
    /// their waiters but their results are not stored.
    pub async fn refresh(&self, kind: ContentKind) {
        let categories = self.categories.invalidate(|k| *k == kind).await;
        let items = self.items.invalidate(|k| k.kind == kind).await;
        let series = if kind == ContentKind::Series {
            self.series.invalidate(|_| true).await
        } else {
            0
        };
        info!(
            kind = %kind,
            categories,
            items,
            series,
            "Catalog cache refreshed"
        );
    }

    pub async fn is_cached(&self, kind: ContentKind, category_id: &str) -> bool {
        match self.item_key(kind, category_id) {
            Ok(key) => self.items.is_ready(&key).await,
            Err(_) => false,
        }
    }

    /// Number of categories whose item list is held in memory
    pub async fn cached_category_count(&self) -> usize {
        self.items.ready_count().await
    }

    fn item_key(&self, kind: ContentKind, category_id: &str) -> CatalogResult<CacheKey> {
        let category_id = category_id.trim();
        if category_id.is_empty() {
            return Err(CatalogError::NotFound("Empty category id".to_string()));
        }
        Ok(CacheKey::new(kind, category_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::remote::fake::FakeCatalog;
    use std::time::Duration;

    fn cache_with(fake: Arc<FakeCatalog>) -> CategoryCache {
        CategoryCache::new(fake)
    }

    #[tokio::test]
    async fn test_fetching_one_category_does_not_touch_others() {
        let fake = Arc::new(FakeCatalog::default());
        let cache = cache_with(fake.clone());

        let items = cache.items_for_category(ContentKind::Vod, "1").await.unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(fake.item_calls(ContentKind::Vod, "1"), 1);
        assert_eq!(fake.item_calls(ContentKind::Vod, "2"), 0);
        assert_eq!(fake.total_item_calls(), 1);
    }

    #[tokio::test]
    async fn test_repeated_calls_are_memoized() {
        let fake = Arc::new(FakeCatalog::default());
        let cache = cache_with(fake.clone());

        for _ in 0..5 {
            cache.items_for_category(ContentKind::Series, "2").await.unwrap();
        }
        assert_eq!(fake.item_calls(ContentKind::Series, "2"), 1);
        assert!(cache.is_cached(ContentKind::Series, "2").await);
    }

    #[tokio::test]
    async fn test_same_category_id_is_distinct_per_kind() {
        let fake = Arc::new(FakeCatalog::default());
        let cache = cache_with(fake.clone());

        cache.items_for_category(ContentKind::Vod, "1").await.unwrap();
        cache.items_for_category(ContentKind::Series, "1").await.unwrap();
        assert_eq!(fake.item_calls(ContentKind::Vod, "1"), 1);
        assert_eq!(fake.item_calls(ContentKind::Series, "1"), 1);
        assert_eq!(cache.cached_category_count().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_coalesced() {
        let fake = Arc::new(FakeCatalog::default());
        fake.hold();
        let cache = Arc::new(cache_with(fake.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.items_for_category(ContentKind::Vod, "3").await
            }));
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        fake.release();

        for handle in handles {
            let items = handle.await.unwrap().unwrap();
            assert_eq!(items.len(), 3);
        }
        assert_eq!(fake.item_calls(ContentKind::Vod, "3"), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached_and_keeps_other_entries() {
        let fake = Arc::new(FakeCatalog::default());
        let cache = cache_with(fake.clone());

        cache.items_for_category(ContentKind::Vod, "1").await.unwrap();
        fake.fail_category("2");

        let err = cache.items_for_category(ContentKind::Vod, "2").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(cache.is_cached(ContentKind::Vod, "1").await);
        assert!(!cache.is_cached(ContentKind::Vod, "2").await);

        fake.heal_category("2");
        cache.items_for_category(ContentKind::Vod, "2").await.unwrap();
        assert_eq!(fake.item_calls(ContentKind::Vod, "2"), 2);
        assert_eq!(fake.item_calls(ContentKind::Vod, "1"), 1);
    }

    #[tokio::test]
    async fn test_categories_fetched_once_until_refresh() {
        let fake = Arc::new(FakeCatalog::default());
        let cache = cache_with(fake.clone());

        cache.categories(ContentKind::Live).await.unwrap();
        cache.categories(ContentKind::Live).await.unwrap();
        assert_eq!(fake.category_calls.load(Ordering::SeqCst), 1);

        cache.items_for_category(ContentKind::Live, "1").await.unwrap();
        cache.items_for_category(ContentKind::Vod, "1").await.unwrap();
        cache.refresh(ContentKind::Live).await;

        assert!(!cache.is_cached(ContentKind::Live, "1").await);
        assert!(cache.is_cached(ContentKind::Vod, "1").await);

        cache.categories(ContentKind::Live).await.unwrap();
        assert_eq!(fake.category_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_caller_does_not_cancel_shared_fetch() {
        let fake = Arc::new(FakeCatalog::default());
        fake.hold();
        let cache = Arc::new(cache_with(fake.clone()));

        let token = CancellationToken::new();
        let abandoning = {
            let cache = Arc::clone(&cache);
            let token = token.clone();
            tokio::spawn(async move {
                cache
                    .items_for_category_cancellable(ContentKind::Vod, "1", &token)
                    .await
            })
        };
        let waiting = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.items_for_category(ContentKind::Vod, "1").await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
        assert_eq!(abandoning.await.unwrap(), Err(CatalogError::Cancelled));

        fake.release();
        assert_eq!(waiting.await.unwrap().unwrap().len(), 3);
        assert!(cache.is_cached(ContentKind::Vod, "1").await);
        assert_eq!(fake.item_calls(ContentKind::Vod, "1"), 1);
    }

    #[tokio::test]
    async fn test_series_detail_is_memoized_and_validated() {
        let fake = Arc::new(FakeCatalog::default());
        let cache = cache_with(fake.clone());

        let detail = cache.series_detail(7).await.unwrap();
        assert_eq!(detail.episode_count(), 1);
        cache.series_detail(7).await.unwrap();
        assert_eq!(fake.series_calls.load(Ordering::SeqCst), 1);

        assert!(matches!(
            cache.series_detail(0).await,
            Err(CatalogError::NotFound(_))
        ));
        assert_eq!(fake.series_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_category_id_is_rejected() {
        let fake = Arc::new(FakeCatalog::default());
        let cache = cache_with(fake.clone());
        assert!(cache.items_for_category(ContentKind::Vod, "  ").await.is_err());
        assert_eq!(fake.total_item_calls(), 0);
    }
    #[tokio::test]
    async fn test_padded_category_id_shares_entry() {
        let fake = Arc::new(FakeCatalog::default());
        let cache = cache_with(fake.clone());
        cache.items_for_category(ContentKind::Vod, " 1 ").await.unwrap();

        assert!(cache.is_cached(ContentKind::Vod, " 1 ").await);
        assert!(cache.is_cached(ContentKind::Vod, "1").await);
        assert!(!cache.is_cached(ContentKind::Vod, "  ").await);
        cache.items_for_category(ContentKind::Vod, "1").await.unwrap();
        assert_eq!(fake.item_calls(ContentKind::Vod, "1"), 1);
    }
}
