//! Idempotency store for de-duplicating inbound chat events

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// How long a seen event id is remembered: one hour, well past Slack's retry window
pub const EVENT_DEDUPE_TTL: Duration = Duration::from_secs(3600);

/// LRU-bounded key set with TTL. Cloning shares the underlying cache.
#[derive(Clone)]
pub struct IdempotencyStore {
    cache: Arc<Mutex<LruCache<String, Instant>>>,
    ttl: Duration,
}

impl IdempotencyStore {
    /// * `capacity` - keys tracked before the least recent is evicted (min 1)
    /// * `ttl` - how long a key counts as seen
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            ttl,
        }
    }

    /// Returns `true` if `key` was already seen within the TTL, otherwise
    /// records it and returns `false`
    pub async fn check_and_insert(&self, key: &str) -> bool {
        let mut cache = self.cache.lock().await;
        let now = Instant::now();

        if let Some(inserted_at) = cache.get(key) {
            if now.duration_since(*inserted_at) < self.ttl {
                return true;
            }
            cache.pop(key);
        }

        cache.put(key.to_string(), now);
        false
    }

    pub async fn len(&self) -> usize {
        self.cache.lock().await.len()
    }
}
