//! Process-local cache provider on top of moka.
//!
//! Holds coverage entries for tests and single-process hosts. Like the disk
//! provider, the byte budget only rejects a single value larger than the
//! budget; stored entries stay until overwritten, deleted, or expired by an
//! optional TTL.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use moka::future::Cache as MokaCache;

use crate::cache::traits::{validate_key, BoxFuture, Cache, GcResult, ServiceCacheError};

pub struct MemoryCacheProvider {
    entries: MokaCache<String, Vec<u8>>,
    budget: AtomicU64,
}

impl MemoryCacheProvider {
    pub fn new(max_size_bytes: u64) -> Self {
        Self::build(max_size_bytes, None)
    }

    /// Entries expire `ttl` after they were written.
    pub fn with_ttl(max_size_bytes: u64, ttl: Duration) -> Self {
        Self::build(max_size_bytes, Some(ttl))
    }

    fn build(max_size_bytes: u64, ttl: Option<Duration>) -> Self {
        // Weighted by payload length so `size_bytes` reports bytes. No
        // capacity is set: moka would otherwise evict on its own.
        let builder = MokaCache::builder().weigher(|_: &String, payload: &Vec<u8>| {
            u32::try_from(payload.len()).unwrap_or(u32::MAX)
        });
        let entries = match ttl {
            Some(ttl) => builder.time_to_live(ttl).build(),
            None => builder.build(),
        };
        Self {
            entries,
            budget: AtomicU64::new(max_size_bytes),
        }
    }

    fn admit(&self, key: &str, payload: &[u8]) -> Result<(), ServiceCacheError> {
        validate_key(key)?;
        let max = self.max_size_bytes();
        if payload.len() as u64 > max {
            return Err(ServiceCacheError::ValueTooLarge {
                size: payload.len(),
                max,
            });
        }
        Ok(())
    }
}

impl Cache for MemoryCacheProvider {
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, Result<(), ServiceCacheError>> {
        let admitted = self.admit(key, &value);
        let owned = key.to_owned();
        Box::pin(async move {
            admitted?;
            self.entries.insert(owned, value).await;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, ServiceCacheError>> {
        let owned = key.to_owned();
        Box::pin(async move { Ok(self.entries.get(&owned).await) })
    }

    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>> {
        let owned = key.to_owned();
        Box::pin(async move { Ok(self.entries.remove(&owned).await.is_some()) })
    }

    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, ServiceCacheError>> {
        let found = self.entries.contains_key(key);
        Box::pin(async move { Ok(found) })
    }

    fn size_bytes(&self) -> u64 {
        self.entries.weighted_size()
    }

    fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    fn max_size_bytes(&self) -> u64 {
        self.budget.load(Ordering::Relaxed)
    }

    fn set_max_size(&self, size_bytes: u64) -> BoxFuture<'_, Result<(), ServiceCacheError>> {
        self.budget.store(size_bytes, Ordering::Relaxed);
        Box::pin(async { Ok(()) })
    }

    /// Drops expired entries and refreshes the size counters.
    fn gc(&self) -> BoxFuture<'_, Result<GcResult, ServiceCacheError>> {
        Box::pin(async move {
            let started = Instant::now();
            let (count, bytes) = (self.entry_count(), self.size_bytes());
            self.entries.run_pending_tasks().await;

            Ok(GcResult {
                entries_removed: count.saturating_sub(self.entry_count()) as usize,
                bytes_freed: bytes.saturating_sub(self.size_bytes()),
                duration_ms: started.elapsed().as_millis() as u64,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_memory_provider_round_trip_and_delete() {
        let cache = MemoryCacheProvider::new(1_000_000);
        assert_eq!(cache.entry_count(), 0);

        cache.set("coverage:kenya", b"{}".to_vec()).await.unwrap();
        assert!(cache.contains("coverage:kenya").await.unwrap());
        assert_eq!(
            cache.get("coverage:kenya").await.unwrap().as_deref(),
            Some(&b"{}"[..])
        );

        assert!(cache.delete("coverage:kenya").await.unwrap());
        assert!(!cache.delete("coverage:kenya").await.unwrap());
        assert!(cache.get("coverage:kenya").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_provider_overwrite_replaces_payload() {
        let cache = MemoryCacheProvider::new(1_000_000);
        cache.set("coverage:default", vec![1, 2, 3]).await.unwrap();
        cache.set("coverage:default", vec![4, 5]).await.unwrap();
        cache.gc().await.unwrap();

        assert_eq!(cache.get("coverage:default").await.unwrap(), Some(vec![4, 5]));
        assert_eq!(cache.entry_count(), 1);
        assert_eq!(cache.size_bytes(), 2);
    }

    #[tokio::test]
    async fn test_memory_provider_rejects_bad_input() {
        let cache = MemoryCacheProvider::new(100);
        assert!(matches!(
            cache.set("", vec![1]).await,
            Err(ServiceCacheError::InvalidKey(_))
        ));
        assert!(matches!(
            cache.set("big", vec![0u8; 101]).await,
            Err(ServiceCacheError::ValueTooLarge { size: 101, max: 100 })
        ));
        assert!(!cache.contains("big").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_provider_over_budget_keeps_every_region() {
        let cache = MemoryCacheProvider::new(150);
        for region in ["kenya", "ethiopia", "somalia"] {
            cache
                .set(&format!("coverage:{}", region), vec![0u8; 100])
                .await
                .unwrap();
        }
        cache.gc().await.unwrap();

        assert_eq!(cache.entry_count(), 3);
        assert_eq!(cache.size_bytes(), 300);
        assert!(cache.get("coverage:kenya").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_memory_provider_ttl_expiry() {
        let cache = MemoryCacheProvider::with_ttl(1_000_000, Duration::from_millis(50));
        cache.set("a", vec![1]).await.unwrap();
        assert!(cache.get("a").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(cache.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_provider_concurrent_regions() {
        let cache = Arc::new(MemoryCacheProvider::new(10_000_000));
        let writers: Vec<_> = (0..32u8)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    let key = format!("coverage:region-{}", i);
                    cache.set(&key, vec![i; 64]).await.unwrap();
                    cache.get(&key).await.unwrap()
                })
            })
            .collect();

        for (i, writer) in writers.into_iter().enumerate() {
            assert_eq!(writer.await.unwrap(), Some(vec![i as u8; 64]));
        }
        cache.gc().await.unwrap();
        assert_eq!(cache.entry_count(), 32);
    }
}
