use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    payload: Vec<u8>,
    expires_at: Instant,
}

/// In-process cache backend (dev / single-node).
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

/// Expired entries are dropped lazily on read and swept once the map grows
/// past this many keys.
const SWEEP_THRESHOLD: usize = 4096;

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        {
            let entries = self.entries.read().unwrap();
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Some(entry.payload.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Stale hit: drop it under the write lock.
        self.entries.write().unwrap().remove(key);
        None
    }

    pub fn set(&self, key: &str, payload: Vec<u8>, ttl: Duration) {
        let mut entries = self.entries.write().unwrap();
        if entries.len() >= SWEEP_THRESHOLD {
            let now = Instant::now();
            entries.retain(|_, entry| entry.expires_at > now);
        }
        entries.insert(
            key.to_string(),
            Entry {
                payload,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn invalidate_prefix(&self, prefix: &str) {
        self.entries
            .write()
            .unwrap()
            .retain(|key, _| !key.starts_with(prefix));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_live_entries_only() {
        let cache = MemoryCache::new();
        cache.set("a", vec![1], Duration::from_secs(60));
        assert_eq!(cache.get("a"), Some(vec![1]));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn test_invalidate_prefix_is_scoped() {
        let cache = MemoryCache::new();
        cache.set("withdraw:x", vec![1], Duration::from_secs(60));
        cache.set("card:y", vec![2], Duration::from_secs(60));
        cache.invalidate_prefix("withdraw:");
        assert_eq!(cache.get("withdraw:x"), None);
        assert_eq!(cache.get("card:y"), Some(vec![2]));
    }
}
