//! Keyed async locks.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per key, created on first use.
///
/// Operations on different keys never contend. Idle entries are dropped by
/// [`KeyedLocks::prune`].
pub struct KeyedLocks<K> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        let mutex = self.locks.entry(key.clone()).or_default().clone();
        mutex.lock_owned().await
    }

    /// Locks several keys in ascending order, skipping duplicates.
    ///
    /// A consistent order keeps two callers locking overlapping key sets from
    /// deadlocking.
    pub async fn lock_all(&self, keys: &[K]) -> Vec<OwnedMutexGuard<()>>
    where
        K: Ord,
    {
        let mut sorted: Vec<&K> = keys.iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut guards = Vec::with_capacity(sorted.len());
        for key in sorted {
            guards.push(self.lock(key).await);
        }
        guards
    }

    /// Drops locks nobody holds or waits for.
    pub fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::<String>::new());
        let guard = locks.lock(&"pair".to_string()).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&"pair".to_string()).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_contend() {
        let locks = KeyedLocks::<String>::new();
        let _a = locks.lock(&"a".to_string()).await;
        let _b = tokio::time::timeout(Duration::from_millis(50), locks.lock(&"b".to_string()))
            .await
            .expect("independent key should not wait");
    }

    #[tokio::test]
    async fn test_lock_all_dedups_and_prune_drops_idle() {
        let locks = KeyedLocks::<String>::new();
        let keys = vec!["b".to_string(), "a".to_string(), "b".to_string()];

        let guards = locks.lock_all(&keys).await;
        assert_eq!(guards.len(), 2);
        locks.prune();
        assert_eq!(locks.len(), 2);

        drop(guards);
        locks.prune();
        assert!(locks.is_empty());
    }
}
