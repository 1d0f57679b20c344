use std::{collections::HashMap, hash::Hash, sync::Arc, time::Duration};

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::domain::{ChatKey, Member};

/// Member lists keyed by the chat reference they were fetched for.
pub type MembersCache = TtlCache<ChatKey, Arc<Vec<Member>>>;

/// Default validity of a fetched member list.
pub const DEFAULT_MEMBERS_TTL: Duration = Duration::from_secs(600);

/// Longest accepted TTL; longer ones are clamped.
pub const MAX_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Shared cache whose entries expire a fixed time after insertion.
///
/// Expired entries are evicted when read and swept on every insert.
/// Concurrent inserts for the same key are last-writer-wins.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: ttl.min(MAX_TTL),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now()).await
    }

    pub async fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        {
            let map = self.entries.read().await;
            match map.get(key) {
                None => return None,
                Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }

        let mut map = self.entries.write().await;
        if map.get(key).is_some_and(|e| e.expires_at <= now) {
            map.remove(key);
        }
        None
    }

    pub async fn has_valid_entry(&self, key: &K) -> bool {
        self.has_valid_entry_at(key, Instant::now()).await
    }

    pub async fn has_valid_entry_at(&self, key: &K, now: Instant) -> bool {
        let map = self.entries.read().await;
        map.get(key).is_some_and(|e| e.expires_at > now)
    }

    pub async fn insert(&self, key: K, value: V) {
        self.insert_at(key, value, Instant::now()).await;
    }

    pub async fn insert_at(&self, key: K, value: V, now: Instant) {
        let expires_at = now + self.ttl;
        let mut map = self.entries.write().await;
        map.retain(|_, e| e.expires_at > now);
        map.insert(key, Entry { value, expires_at });
    }

    pub async fn invalidate(&self, key: &K) {
        self.entries.write().await.remove(key);
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl<K: Eq + Hash, V: Clone> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_MEMBERS_TTL)
    }
}
