//! TTL cache over a [`SnapshotStore`], rebuilding from a [`SnapshotSource`] on miss.
//!
//! Used for both style fingerprints and knowledge maps. The store is the only
//! cache; there is no in-process copy, so every reader sees the last write.

use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info};
use voiceprint_core::clock::Clock;
use voiceprint_core::error::Result;
use voiceprint_core::fingerprint::StyleFingerprint;
use voiceprint_core::knowledge::KnowledgeMap;
use voiceprint_core::store::{Snapshot, SnapshotStore, Stamped};

/// A freshly built value.
#[derive(Debug, Clone, PartialEq)]
pub struct Built<T> {
    pub value: T,
    /// False for fallbacks that must not be cached.
    pub durable: bool,
}

impl<T> Built<T> {
    pub fn durable(value: T) -> Self {
        Self { value, durable: true }
    }

    pub fn fallback(value: T) -> Self {
        Self { value, durable: false }
    }
}

/// Something that can rebuild a per-user snapshot from scratch.
#[async_trait]
pub trait SnapshotSource<T>: Send + Sync {
    async fn build(&self, user_id: &str) -> Result<Built<T>>;
}

pub struct SnapshotCache<T: Snapshot> {
    store: Arc<dyn SnapshotStore<T>>,
    source: Arc<dyn SnapshotSource<T>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

pub type FingerprintCache = SnapshotCache<StyleFingerprint>;
pub type KnowledgeCache = SnapshotCache<KnowledgeMap>;

impl<T: Snapshot> SnapshotCache<T> {
    pub fn new(
        store: Arc<dyn SnapshotStore<T>>,
        source: Arc<dyn SnapshotSource<T>>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self { store, source, clock, ttl }
    }

    /// The stored value if younger than the TTL, otherwise a rebuilt one.
    pub async fn get(&self, user_id: &str) -> Result<T> {
        if let Some(stamped) = self.fresh(user_id).await? {
            debug!(kind = T::KIND, user_id, "Snapshot cache hit");
            return Ok(stamped.value);
        }

        let built = self.source.build(user_id).await?;
        if built.durable {
            let updated_at = self.clock.now();
            self.store
                .put(user_id, Stamped { value: built.value.clone(), updated_at })
                .await?;
            info!(kind = T::KIND, user_id, %updated_at, "Snapshot rebuilt and stored");
        } else {
            debug!(kind = T::KIND, user_id, "Snapshot rebuilt as fallback, not stored");
        }
        Ok(built.value)
    }

    /// The stored value and its timestamp, if any, without rebuilding.
    pub async fn peek(&self, user_id: &str) -> Result<Option<Stamped<T>>> {
        Ok(self.store.get(user_id).await?)
    }

    /// Drop the stored value so the next `get` rebuilds it.
    pub async fn invalidate(&self, user_id: &str) -> Result<bool> {
        let existed = self.store.delete(user_id).await?;
        if existed {
            info!(kind = T::KIND, user_id, "Snapshot invalidated");
        }
        Ok(existed)
    }

    /// Invalidate and rebuild.
    pub async fn refresh(&self, user_id: &str) -> Result<T> {
        self.invalidate(user_id).await?;
        self.get(user_id).await
    }

    async fn fresh(&self, user_id: &str) -> Result<Option<Stamped<T>>> {
        let Some(stamped) = self.store.get(user_id).await? else {
            return Ok(None);
        };
        let age = self.clock.now() - stamped.updated_at;
        Ok((age < self.ttl).then_some(stamped))
    }
}
