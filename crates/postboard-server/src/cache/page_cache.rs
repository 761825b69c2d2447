use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::auth::session::session_user;
use crate::state::AppState;

/// Cached pages vary on the request target and on who is looking at it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub path_and_query: String,
    pub viewer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CachedPage {
    pub body: Bytes,
    pub content_type: Option<HeaderValue>,
    stored_at: Instant,
}

/// Thread-safe in-memory full-page cache with a fixed time-to-live.
#[derive(Clone)]
pub struct PageCache {
    storage: Arc<DashMap<CacheKey, CachedPage>>,
    ttl: Duration,
}

impl PageCache {
    pub fn new(ttl: Duration) -> Self {
        info!("Initializing page cache (ttl: {:?})", ttl);
        Self {
            storage: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Returns None if absent or expired. Expired entries are dropped here,
    /// unless a fresh `set` replaced them in the meantime.
    pub fn get(&self, key: &CacheKey) -> Option<CachedPage> {
        let page = self.storage.get(key)?.value().clone();

        if page.stored_at.elapsed() >= self.ttl {
            if self.remove_expired(key) {
                debug!("Cached page {} expired", key.path_and_query);
            }
            return None;
        }

        Some(page)
    }

    /// Removes the entry only if the stored copy is still the expired one.
    fn remove_expired(&self, key: &CacheKey) -> bool {
        let ttl = self.ttl;
        self.storage
            .remove_if(key, |_, p| p.stored_at.elapsed() >= ttl)
            .is_some()
    }

    pub fn set(&self, key: CacheKey, body: Bytes, content_type: Option<HeaderValue>) {
        self.storage.insert(
            key,
            CachedPage {
                body,
                content_type,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn clear(&self) {
        self.storage.clear();
        info!("Page cache cleared");
    }

    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let start_len = self.storage.len();
        let ttl = self.ttl;
        self.storage.retain(|_, page| page.stored_at.elapsed() < ttl);
        let removed = start_len.saturating_sub(self.storage.len());

        if removed > 0 {
            debug!("Purged {} expired pages", removed);
        }

        removed
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Periodically drops expired entries so unvisited pages do not linger.
    pub fn spawn_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every.max(Duration::from_secs(1)));
            loop {
                interval.tick().await;
                cache.purge_expired();
            }
        })
    }

    fn cache_control(&self) -> HeaderValue {
        HeaderValue::from_str(&format!("max-age={}", self.ttl.as_secs()))
            .unwrap_or_else(|_| HeaderValue::from_static("no-cache"))
    }

    fn to_response(&self, page: CachedPage) -> Response {
        let mut response = Response::new(Body::from(page.body));
        let headers = response.headers_mut();
        if let Some(content_type) = page.content_type {
            headers.insert(header::CONTENT_TYPE, content_type);
        }
        headers.insert(header::CACHE_CONTROL, self.cache_control());
        response
    }
}

/// Serves GET/HEAD requests from the page cache, storing successful renders.
pub async fn cache_page(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return next.run(request).await;
    }

    let cache = state.page_cache.clone();
    let is_get = request.method() == Method::GET;
    let key = CacheKey {
        path_and_query: request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string()),
        viewer: session_user(request.headers(), &state).map(|u| u.username),
    };

    if let Some(page) = cache.get(&key) {
        debug!("Page cache hit for {}", key.path_and_query);
        return cache.to_response(page);
    }

    debug!("Page cache miss for {}", key.path_and_query);
    let response = next.run(request).await;
    // HEAD misses are not stored; their bodies may be empty
    if !is_get || response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to buffer response for caching: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to buffer response").into_response();
        }
    };

    let content_type = parts.headers.get(header::CONTENT_TYPE).cloned();
    cache.set(key, bytes.clone(), content_type);

    let mut response = Response::from_parts(parts, Body::from(bytes));
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, cache.cache_control());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(path: &str) -> CacheKey {
        CacheKey {
            path_and_query: path.to_string(),
            viewer: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = PageCache::new(Duration::from_secs(20));
        cache.set(key("/"), Bytes::from_static(b"<html>"), None);

        tokio::time::advance(Duration::from_secs(19)).await;
        assert_eq!(cache.get(&key("/")).unwrap().body, Bytes::from_static(b"<html>"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(&key("/")).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_keeps_entry_stored_after_read() {
        let cache = PageCache::new(Duration::from_secs(20));
        cache.set(key("/"), Bytes::from_static(b"stale"), None);
        tokio::time::advance(Duration::from_secs(20)).await;

        // a request re-renders the page between the expired read and the eviction
        cache.set(key("/"), Bytes::from_static(b"fresh"), None);
        assert!(!cache.remove_expired(&key("/")));
        assert_eq!(cache.get(&key("/")).unwrap().body, Bytes::from_static(b"fresh"));
    }

    #[tokio::test]
    async fn test_keys_vary_on_viewer_and_query() {
        let cache = PageCache::new(Duration::from_secs(20));
        cache.set(key("/"), Bytes::from_static(b"anon"), None);

        let signed_in = CacheKey {
            path_and_query: "/".to_string(),
            viewer: Some("leo".to_string()),
        };
        assert!(cache.get(&signed_in).is_none());
        assert!(cache.get(&key("/?page=2")).is_none());
        assert!(cache.get(&key("/")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = PageCache::new(Duration::from_secs(10));
        cache.set(key("/"), Bytes::from_static(b"a"), None);
        tokio::time::advance(Duration::from_secs(5)).await;
        cache.set(key("/?page=2"), Bytes::from_static(b"b"), None);
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = PageCache::new(Duration::from_secs(10));
        cache.set(key("/"), Bytes::from_static(b"a"), None);
        cache.clear();
        assert!(cache.get(&key("/")).is_none());
    }
}
