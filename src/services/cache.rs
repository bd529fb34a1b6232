use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::models::JobMatch;

/// Versions of the inputs a cached match was computed from
///
/// A cached match is fresh only while all three still hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stamp {
    pub profile_generation: u64,
    pub posting_revision: u64,
    pub vocabulary_epoch: u64,
}

#[derive(Debug, Clone)]
struct CachedMatch {
    stamp: Stamp,
    job_match: Arc<JobMatch>,
}

/// Concurrent cache of computed (profile, posting) matches
///
/// Entries carry the stamp of their inputs; a lookup with a different stamp
/// is a miss. Eviction only costs a recomputation.
pub struct MatchCache {
    entries: moka::future::Cache<String, CachedMatch>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MatchCache {
    /// Create a new cache holding up to `capacity` pairs
    pub fn new(capacity: u64, ttl_secs: Option<u64>) -> Self {
        let mut builder = moka::future::CacheBuilder::new(capacity);
        if let Some(ttl) = ttl_secs {
            builder = builder.time_to_live(Duration::from_secs(ttl));
        }

        Self {
            entries: builder.build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a match if one was cached for exactly these inputs
    pub async fn get_fresh(
        &self,
        profile_id: &str,
        posting_id: &str,
        stamp: Stamp,
    ) -> Option<Arc<JobMatch>> {
        let key = CacheKey::pair(profile_id, posting_id);

        match self.entries.get(&key).await {
            Some(cached) if cached.stamp == stamp => {
                tracing::trace!("Match cache hit: {}", key);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(cached.job_match)
            }
            _ => {
                tracing::trace!("Match cache miss: {}", key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub async fn insert(&self, stamp: Stamp, job_match: Arc<JobMatch>) {
        let key = CacheKey::pair(&job_match.profile_id, &job_match.job_posting_id);
        self.entries
            .insert(key, CachedMatch { stamp, job_match })
            .await;
    }

    /// Drop the cached match for one pair
    pub async fn invalidate(&self, profile_id: &str, posting_id: &str) {
        self.entries
            .invalidate(&CacheKey::pair(profile_id, posting_id))
            .await;
    }

    /// Drop every cached match
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
        tracing::debug!("Invalidated all cached matches");
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        CacheStats {
            entries: self.entries.entry_count(),
            hit_count: hits,
            miss_count: misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for a (profile, posting) match
    pub fn pair(profile_id: &str, posting_id: &str) -> String {
        format!("match:{}:{}", profile_id, posting_id)
    }
}
