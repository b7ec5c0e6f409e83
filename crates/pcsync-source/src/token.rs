//! Time-bounded cache for the PC Service bearer token.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::SourceError;

struct CachedToken {
    value: String,
    issued_at: Instant,
}

/// Holds the last token handed out by `auth/login` and reissues it until it
/// is older than the configured lifetime.
///
/// The lock is held across the refresh so concurrent callers log in once.
pub struct TokenCache {
    ttl: Duration,
    slot: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached token, or calls `login` to obtain a fresh one.
    ///
    /// # Errors
    ///
    /// Propagates any error returned by `login`; the cache is left empty.
    pub async fn get_or_refresh<F, Fut>(&self, login: F) -> Result<String, SourceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, SourceError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(cached) = slot.as_ref() {
            if cached.issued_at.elapsed() < self.ttl {
                return Ok(cached.value.clone());
            }
            tracing::debug!("PC Service token expired; refreshing");
        }

        let value = login().await?;
        *slot = Some(CachedToken {
            value: value.clone(),
            issued_at: Instant::now(),
        });
        Ok(value)
    }

    /// Drops the cached token so the next call logs in again.
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    async fn fetch(cache: &TokenCache, calls: &AtomicU32) -> String {
        cache
            .get_or_refresh(move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(format!("token-{n}"))
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn reuses_token_within_ttl() {
        let cache = TokenCache::new(Duration::from_secs(600));
        let calls = AtomicU32::new(0);
        assert_eq!(fetch(&cache, &calls).await, "token-1");
        assert_eq!(fetch(&cache, &calls).await, "token-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_ttl_always_refreshes() {
        let cache = TokenCache::new(Duration::ZERO);
        let calls = AtomicU32::new(0);
        assert_eq!(fetch(&cache, &calls).await, "token-1");
        assert_eq!(fetch(&cache, &calls).await, "token-2");
    }

    #[tokio::test]
    async fn invalidate_forces_new_login() {
        let cache = TokenCache::new(Duration::from_secs(600));
        let calls = AtomicU32::new(0);
        fetch(&cache, &calls).await;
        cache.invalidate().await;
        assert_eq!(fetch(&cache, &calls).await, "token-2");
    }

    #[tokio::test]
    async fn failed_login_leaves_cache_empty() {
        let cache = TokenCache::new(Duration::from_secs(600));
        let result = cache
            .get_or_refresh(|| async { Err(SourceError::MissingToken) })
            .await;
        assert!(matches!(result, Err(SourceError::MissingToken)));

        let calls = AtomicU32::new(0);
        assert_eq!(fetch(&cache, &calls).await, "token-1");
    }
}
