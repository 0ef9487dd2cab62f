use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

/// Per-card serialisation primitive. Every balance-mutating pipeline holds
/// its card's lock from card resolution until the ledger row reaches a
/// terminal status; the guard is owned so it can travel into the detached
/// finalisation task and is released even if that task panics.
#[derive(Default)]
pub struct CardLockRegistry {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl CardLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, card_number: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            locks
                .entry(card_number.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Locks two cards in lexicographic order so concurrent transfers on the
    /// same pair cannot deadlock. Equal numbers take a single lock.
    pub async fn acquire_pair(
        &self,
        a: &str,
        b: &str,
    ) -> (OwnedMutexGuard<()>, Option<OwnedMutexGuard<()>>) {
        if a == b {
            return (self.acquire(a).await, None);
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first_guard = self.acquire(first).await;
        let second_guard = self.acquire(second).await;
        (first_guard, Some(second_guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_card_is_mutually_exclusive() {
        let registry = Arc::new(CardLockRegistry::new());
        let guard = registry.acquire("4000000000000001").await;

        let registry2 = registry.clone();
        let contended = tokio::spawn(async move {
            registry2.acquire("4000000000000001").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contended.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contended)
            .await
            .expect("lock released")
            .unwrap();
    }

    #[tokio::test]
    async fn test_distinct_cards_do_not_contend() {
        let registry = CardLockRegistry::new();
        let _a = registry.acquire("4000000000000001").await;
        let _b = registry.acquire("4000000000000002").await;
    }

    #[tokio::test]
    async fn test_pair_ordering_prevents_deadlock() {
        let registry = Arc::new(CardLockRegistry::new());
        let r1 = registry.clone();
        let r2 = registry.clone();
        let t1 = tokio::spawn(async move {
            for _ in 0..50 {
                let _g = r1.acquire_pair("a", "b").await;
            }
        });
        let t2 = tokio::spawn(async move {
            for _ in 0..50 {
                let _g = r2.acquire_pair("b", "a").await;
            }
        });
        tokio::time::timeout(Duration::from_secs(5), async {
            t1.await.unwrap();
            t2.await.unwrap();
        })
        .await
        .expect("no deadlock");
    }
}
