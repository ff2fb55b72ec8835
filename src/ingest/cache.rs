// src/ingest/cache.rs
//! Single-slot, time-bucketed memoization of an adapter's fetch.
//!
//! Each adapter owns exactly one `(bucket_index, items)` entry. A call with the
//! stored bucket is a hit and never touches the network; any other bucket
//! drops the entry and fetches again.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use metrics::counter;
use tokio::sync::Mutex;

use crate::ingest::types::{AdapterDescriptor, ContentItem, SourceAdapter};

/// `floor(now_secs / ttl_secs)`. A zero TTL is treated as one second.
pub fn bucket_index(now_secs: u64, ttl_secs: u64) -> u64 {
    now_secs / ttl_secs.max(1)
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub bucket_index: u64,
    pub items: Vec<ContentItem>,
}

/// Capacity-1 cache slot. The async mutex is held across the underlying
/// fetch, so calls on the same adapter are serialized.
#[derive(Debug, Default)]
pub struct BucketCache {
    slot: Mutex<Option<CacheEntry>>,
}

impl BucketCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch<F, Fut>(&self, bucket: u64, fetch: F) -> Result<Vec<ContentItem>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<ContentItem>>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(entry) = slot.as_ref() {
            if entry.bucket_index == bucket {
                counter!("ingest_cache_hits_total").increment(1);
                return Ok(entry.items.clone());
            }
        }

        counter!("ingest_cache_misses_total").increment(1);
        *slot = None;
        let items = fetch().await?;
        *slot = Some(CacheEntry {
            bucket_index: bucket,
            items: items.clone(),
        });
        Ok(items)
    }

    /// Bucket of the stored entry, if any.
    pub async fn stored_bucket(&self) -> Option<u64> {
        self.slot.lock().await.as_ref().map(|e| e.bucket_index)
    }
}

/// An adapter paired with its cache slot.
pub struct CachedAdapter {
    adapter: Arc<dyn SourceAdapter>,
    cache: BucketCache,
}

impl CachedAdapter {
    pub fn new(adapter: Arc<dyn SourceAdapter>) -> Self {
        Self {
            adapter,
            cache: BucketCache::new(),
        }
    }

    pub fn descriptor(&self) -> &AdapterDescriptor {
        self.adapter.descriptor()
    }

    pub fn name(&self) -> &str {
        self.adapter.name()
    }

    pub fn is_available(&self) -> bool {
        self.adapter.is_available()
    }

    pub fn bucket_for(&self, now_secs: u64) -> u64 {
        bucket_index(now_secs, self.descriptor().cache_ttl_seconds)
    }

    pub async fn cached_fetch(&self, bucket: u64) -> Result<Vec<ContentItem>> {
        let adapter = Arc::clone(&self.adapter);
        self.cache
            .get_or_fetch(bucket, || async move { adapter.fetch().await })
            .await
    }

    pub async fn stored_bucket(&self) -> Option<u64> {
        self.cache.stored_bucket().await
    }
}
