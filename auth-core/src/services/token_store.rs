//! Action token store collaborator.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::ActionToken;

/// Abstract store for action tokens.
///
/// `mark_used` is the one operation that must be atomic: multiple service
/// instances may redeem concurrently, so the conditional update is enforced
/// by the storage layer, not by in-process locking.
#[async_trait]
pub trait ActionTokenStore: Send + Sync {
    async fn save(&self, token: ActionToken) -> Result<(), anyhow::Error>;

    async fn find_by_value(&self, value: &str) -> Result<Option<ActionToken>, anyhow::Error>;

    /// Atomic conditional update: set `used = true` where the token exists
    /// and is not yet used. Returns `false` when the token is absent or was
    /// already consumed, so at most one concurrent caller ever sees `true`
    /// for a given value.
    async fn mark_used(&self, value: &str) -> Result<bool, anyhow::Error>;
}

/// DashMap-backed store for tests and embedded deployments. Entry-level
/// locking makes `mark_used` a true compare-and-set.
#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: DashMap<String, ActionToken>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActionTokenStore for InMemoryTokenStore {
    async fn save(&self, token: ActionToken) -> Result<(), anyhow::Error> {
        self.tokens.insert(token.value.clone(), token);
        Ok(())
    }

    async fn find_by_value(&self, value: &str) -> Result<Option<ActionToken>, anyhow::Error> {
        Ok(self.tokens.get(value).map(|entry| entry.value().clone()))
    }

    async fn mark_used(&self, value: &str) -> Result<bool, anyhow::Error> {
        match self.tokens.get_mut(value) {
            Some(mut entry) if !entry.used => {
                entry.used = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionTokenKind;
    use std::sync::Arc;
    use uuid::Uuid;

    fn token(value: &str) -> ActionToken {
        ActionToken::new(
            value.to_string(),
            ActionTokenKind::EmailConfirmation,
            Uuid::new_v4(),
            48,
        )
    }

    #[tokio::test]
    async fn test_mark_used_flips_once() {
        let store = InMemoryTokenStore::new();
        store.save(token("t1")).await.unwrap();

        assert!(store.mark_used("t1").await.unwrap());
        assert!(!store.mark_used("t1").await.unwrap());

        let stored = store.find_by_value("t1").await.unwrap().unwrap();
        assert!(stored.used);
    }

    #[tokio::test]
    async fn test_mark_used_on_missing_token_is_false() {
        let store = InMemoryTokenStore::new();
        assert!(!store.mark_used("ghost").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_mark_used_has_exactly_one_winner() {
        let store = Arc::new(InMemoryTokenStore::new());
        store.save(token("contested")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.mark_used("contested").await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
