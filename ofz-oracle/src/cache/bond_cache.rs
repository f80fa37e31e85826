//! In-memory TTL cache for the list of SECIDs registered on-chain.
//!
//! Ported from `app.py`'s `registered_bonds_cache` module-level dict.
//! Unlike [`super::price_cache::PriceCache`] this never touches disk —
//! the upstream service only ever held it in process memory, and a
//! restart re-querying the chain once is cheap and not worth the
//! cross-restart persistence a price cache needs.

use std::time::{Duration, Instant};

use alloy::primitives::Address;
use tokio::sync::RwLock;

struct Entry {
    bonds: Vec<(String, Address)>,
    fetched_at: Instant,
}

pub struct RegisteredBondsCache {
    ttl: Duration,
    entry: RwLock<Option<Entry>>,
}

impl RegisteredBondsCache {
    pub fn new(ttl: Duration) -> Self {
        RegisteredBondsCache {
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// Returns the cached `(secid, bond address)` list if still within TTL.
    pub async fn get(&self) -> Option<Vec<(String, Address)>> {
        let guard = self.entry.read().await;
        let entry = guard.as_ref()?;
        if entry.fetched_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.bonds.clone())
    }

    pub async fn set(&self, bonds: Vec<(String, Address)>) {
        let mut guard = self.entry.write().await;
        *guard = Some(Entry {
            bonds,
            fetched_at: Instant::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn miss_before_first_set() {
        let cache = RegisteredBondsCache::new(Duration::from_secs(60));
        assert!(cache.get().await.is_none());
    }

    #[tokio::test]
    async fn hit_within_ttl_then_miss_after() {
        let cache = RegisteredBondsCache::new(Duration::from_millis(20));
        cache.set(vec![("SU26207RMFS9".to_string(), Address::ZERO)]).await;
        assert_eq!(cache.get().await.unwrap().len(), 1);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.get().await.is_none());
    }
}
