//! User directory collaborator.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::Account;

/// Abstract user directory consumed by the auth core.
///
/// The production implementation lives with the platform's persistence
/// layer; the core only relies on this contract.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, anyhow::Error>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, anyhow::Error>;

    /// Idempotent upsert keyed by account id.
    async fn save(&self, account: Account) -> Result<Account, anyhow::Error>;
}

/// DashMap-backed directory for tests and embedded deployments.
#[derive(Default)]
pub struct InMemoryDirectory {
    accounts: DashMap<Uuid, Account>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountDirectory for InMemoryDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, anyhow::Error> {
        Ok(self
            .accounts
            .iter()
            .find(|entry| entry.value().email.eq_ignore_ascii_case(email))
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, anyhow::Error> {
        Ok(self.accounts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, account: Account) -> Result<Account, anyhow::Error> {
        self.accounts.insert(account.id, account.clone());
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(email: &str) -> Account {
        Account::new(email.to_string(), "$argon2id$fake".to_string(), None, None)
    }

    #[tokio::test]
    async fn test_save_then_find() {
        let directory = InMemoryDirectory::new();
        let saved = directory.save(account("bob@x.com")).await.unwrap();

        let by_id = directory.find_by_id(saved.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "bob@x.com");

        let by_email = directory.find_by_email("bob@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, saved.id);
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive() {
        let directory = InMemoryDirectory::new();
        directory.save(account("bob@x.com")).await.unwrap();

        assert!(directory
            .find_by_email("BOB@X.COM")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_save_is_an_upsert() {
        let directory = InMemoryDirectory::new();
        let mut saved = directory.save(account("bob@x.com")).await.unwrap();

        saved.mark_verified();
        directory.save(saved.clone()).await.unwrap();

        let found = directory.find_by_id(saved.id).await.unwrap().unwrap();
        assert!(!found.is_unverified());
    }

    #[tokio::test]
    async fn test_missing_account_is_absent_not_error() {
        let directory = InMemoryDirectory::new();
        assert!(directory.find_by_email("ghost@x.com").await.unwrap().is_none());
        assert!(directory.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }
}
