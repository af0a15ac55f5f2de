//! Payload cache: derived per-event data shared across notifications.
//!
//! Many notifications usually reference the same event (every user watching a
//! package gets one). The first delivery attempt for an event stores the data
//! it loaded or rendered here; later ones reuse it until the entry expires.
//!
//! Entries expire a fixed time after they were written, regardless of how
//! often they are read, and are never overwritten while still live.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hub_common::types::{Package, Repository};

use crate::channels::EmailData;

/// Default entry lifetime (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cache key, namespaced by the kind of derived data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    EmailData(Uuid),
    Package(Uuid),
    Repository(Uuid),
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::EmailData(event_id) => write!(f, "emailData.{}", event_id),
            CacheKey::Package(event_id) => write!(f, "package.{}", event_id),
            CacheKey::Repository(event_id) => write!(f, "repository.{}", event_id),
        }
    }
}

/// A cached value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CachedPayload {
    EmailData(EmailData),
    Package(Package),
    Repository(Repository),
}

/// Time-bounded store for derived template data.
///
/// Cache failures never fail a delivery: a backend error is logged and
/// treated as a miss.
#[async_trait]
pub trait PayloadCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<CachedPayload>;

    /// Store `value` unless a live entry already exists for `key`.
    async fn set(&self, key: &CacheKey, value: CachedPayload);
}

/// In-process cache shared by the worker loops of one instance.
pub struct MemoryPayloadCache {
    entries: Cache<String, CachedPayload>,
}

impl MemoryPayloadCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Cache::builder().time_to_live(ttl).build(),
        }
    }
}

impl Default for MemoryPayloadCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[async_trait]
impl PayloadCache for MemoryPayloadCache {
    async fn get(&self, key: &CacheKey) -> Option<CachedPayload> {
        self.entries.get(&key.to_string()).await
    }

    async fn set(&self, key: &CacheKey, value: CachedPayload) {
        // An expired entry counts as absent
        self.entries.entry(key.to_string()).or_insert(value).await;
    }
}

/// Redis-backed cache shared by every worker instance using the same server.
///
/// Uses `SET key value NX EX ttl` so the first writer wins and Redis expires
/// the entry.
pub struct RedisPayloadCache {
    redis: ConnectionManager,
    ttl: Duration,
}

impl RedisPayloadCache {
    const KEY_PREFIX: &'static str = "notifier:payload:";

    pub fn new(redis: ConnectionManager, ttl: Duration) -> Self {
        Self { redis, ttl }
    }

    fn redis_key(key: &CacheKey) -> String {
        format!("{}{}", Self::KEY_PREFIX, key)
    }
}

#[async_trait]
impl PayloadCache for RedisPayloadCache {
    async fn get(&self, key: &CacheKey) -> Option<CachedPayload> {
        let mut redis = self.redis.clone();
        let raw: Option<String> = match redis::cmd("GET")
            .arg(Self::redis_key(key))
            .query_async(&mut redis)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Payload cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw?) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn set(&self, key: &CacheKey, value: CachedPayload) {
        let encoded = match serde_json::to_string(&value) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Payload cache encode failed");
                return;
            }
        };

        let mut redis = self.redis.clone();
        let result: redis::RedisResult<Option<String>> = redis::cmd("SET")
            .arg(Self::redis_key(key))
            .arg(encoded)
            .arg("NX")
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async(&mut redis)
            .await;

        if let Err(e) = result {
            tracing::warn!(key = %key, error = %e, "Payload cache write failed");
        }
    }
}
