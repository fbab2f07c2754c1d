use jiff::Timestamp;
use moka::future::Cache;
use std::time::Duration;
use tracing::trace;

/// Default lifetime of a cached shortlink.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

const DEFAULT_CAPACITY: u64 = 10_000;

/// A short URL produced for one exact long URL.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedShortlink {
    pub short_url: String,
    pub created_at: Timestamp,
}

/// Process-local cache of shortener results keyed by the exact long URL.
///
/// Expired entries read as absent; Moka evicts them lazily. Entries for the
/// same key are interchangeable, so concurrent inserts keep the first
/// writer's value.
#[derive(Debug, Clone)]
pub struct ShortlinkCache {
    cache: Cache<String, CachedShortlink>,
}

impl ShortlinkCache {
    /// Creates a cache with the default 5 minute TTL and 10,000 entries.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CAPACITY, DEFAULT_TTL)
    }

    /// Creates a cache with a custom capacity and time-to-live.
    ///
    /// # Arguments
    ///
    /// * `max_capacity` - Maximum number of entries the cache can hold
    /// * `ttl` - Time-to-live measured from insertion
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Returns the live entry for `long_url`, if any.
    pub async fn get(&self, long_url: &str) -> Option<CachedShortlink> {
        let hit = self.cache.get(long_url).await;
        trace!(hit = hit.is_some(), "shortlink cache lookup");
        hit
    }

    /// Stores `short_url` unless a live entry already exists, and returns
    /// whichever entry won.
    pub async fn insert_if_absent(&self, long_url: &str, short_url: String) -> CachedShortlink {
        let candidate = CachedShortlink {
            short_url,
            created_at: Timestamp::now(),
        };
        self.cache
            .entry(long_url.to_owned())
            .or_insert(candidate)
            .await
            .into_value()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    /// Number of live entries after pending maintenance has run.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl Default for ShortlinkCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_after_insert() {
        let cache = ShortlinkCache::new();
        assert!(cache.get("https://t.me/bot?start=a").await.is_none());

        cache
            .insert_if_absent(
                "https://t.me/bot?start=a",
                "https://s.example/1".to_string(),
            )
            .await;

        let hit = cache.get("https://t.me/bot?start=a").await.unwrap();
        assert_eq!(hit.short_url, "https://s.example/1");
    }

    #[tokio::test]
    async fn keys_are_exact() {
        let cache = ShortlinkCache::new();
        cache
            .insert_if_absent(
                "https://t.me/bot?start=a",
                "https://s.example/1".to_string(),
            )
            .await;

        assert!(cache.get("https://t.me/bot?start=A").await.is_none());
        assert!(cache.get("https://t.me/bot?start=a ").await.is_none());
    }

    #[tokio::test]
    async fn first_writer_wins() {
        let cache = ShortlinkCache::new();

        let first = cache
            .insert_if_absent("https://t.me/bot", "https://s.example/first".to_string())
            .await;
        let second = cache
            .insert_if_absent("https://t.me/bot", "https://s.example/second".to_string())
            .await;

        assert_eq!(first.short_url, "https://s.example/first");
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = ShortlinkCache::with_ttl(100, Duration::from_millis(50));
        cache
            .insert_if_absent("https://t.me/bot", "https://s.example/1".to_string())
            .await;
        assert!(cache.get("https://t.me/bot").await.is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(cache.get("https://t.me/bot").await.is_none());
    }

    #[tokio::test]
    async fn expired_entry_can_be_replaced() {
        let cache = ShortlinkCache::with_ttl(100, Duration::from_millis(50));
        cache
            .insert_if_absent("https://t.me/bot", "https://s.example/old".to_string())
            .await;

        tokio::time::sleep(Duration::from_millis(100)).await;

        let fresh = cache
            .insert_if_absent("https://t.me/bot", "https://s.example/new".to_string())
            .await;
        assert_eq!(fresh.short_url, "https://s.example/new");
    }

    #[tokio::test]
    async fn clear_drops_entries() {
        let cache = ShortlinkCache::new();
        for i in 0..5 {
            cache
                .insert_if_absent(
                    &format!("https://t.me/bot?start={i}"),
                    format!("https://s.example/{i}"),
                )
                .await;
        }
        assert_eq!(cache.entry_count().await, 5);

        cache.clear();

        assert!(cache.get("https://t.me/bot?start=0").await.is_none());
        assert_eq!(cache.entry_count().await, 0);
    }
}
