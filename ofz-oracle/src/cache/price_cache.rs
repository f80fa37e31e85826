//! File-backed TTL cache for the full price snapshot.
//!
//! Ported from `cache_manager.py`: validity is judged by the cache
//! file's mtime, not a value stored alongside the data, so a
//! `PriceCache` shared across process restarts keeps working without
//! reconciling clocks. A `tokio::sync::Mutex` collapses concurrent
//! cache-miss rescans into one: the `/api/prices` handler and a
//! background rescan triggered by `/api/prices/{secid}` never walk
//! every SECID twice at once.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tokio::sync::Mutex;

use crate::error::Result;
use crate::nonce::write_atomic;
use crate::types::PriceSnapshot;

pub struct PriceCache {
    path: PathBuf,
    ttl: Duration,
    /// Held across a full rescan so concurrent callers on a cache miss
    /// wait for the in-flight rescan instead of starting their own.
    refresh_lock: Mutex<()>,
}

impl PriceCache {
    pub fn new(path: PathBuf, ttl: Duration) -> Self {
        PriceCache {
            path,
            ttl,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Acquires the single-flight lock used to serialize rescans. The
    /// returned guard must be held for the duration of the rescan.
    pub async fn refresh_guard(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.refresh_lock.lock().await
    }

    /// Returns the cached snapshot if the file exists and is younger
    /// than the configured TTL; `None` otherwise (missing, expired, or
    /// unreadable — corruption is logged and treated as a miss, never
    /// propagated as an error).
    pub async fn get(&self) -> Option<PriceSnapshot> {
        let metadata = tokio::fs::metadata(&self.path).await.ok()?;
        let modified = metadata.modified().ok()?;
        if SystemTime::now().duration_since(modified).unwrap_or(Duration::MAX) > self.ttl {
            return None;
        }
        let bytes = tokio::fs::read(&self.path).await.ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::error!("price cache at {} is corrupt: {e}", self.path.display());
                None
            }
        }
    }

    pub async fn set(&self, snapshot: &PriceSnapshot) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await.ok();
        }
        let bytes = serde_json::to_vec_pretty(snapshot).expect("PriceSnapshot always serializes");
        write_atomic(&self.path, &bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PriceEntry;
    use std::collections::HashMap;

    fn sample_snapshot() -> PriceSnapshot {
        let mut prices = HashMap::new();
        prices.insert(
            "SU26207RMFS9".to_string(),
            PriceEntry {
                price: "99.875".parse().unwrap(),
                price_uint: "998750000000000000000".to_string(),
                is_current_market_data: true,
                data_source: "market_price".to_string(),
                signature: None,
                nonce: None,
                deadline: None,
            },
        );
        PriceSnapshot {
            timestamp: 1_700_000_000,
            prices,
        }
    }

    #[tokio::test]
    async fn miss_when_file_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path().join("price_cache.json"), Duration::from_secs(10));
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn hit_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path().join("price_cache.json"), Duration::from_secs(60));
        cache.set(&sample_snapshot()).await.unwrap();
        let got = cache.get().await.unwrap();
        assert_eq!(got.timestamp, 1_700_000_000);
    }

    #[tokio::test]
    async fn miss_once_ttl_elapsed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path().join("price_cache.json"), Duration::from_millis(20));
        cache.set(&sample_snapshot()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.get().await.is_none());
    }
}
