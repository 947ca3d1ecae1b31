//! # sentinel-auth-memory
//!
//! In-memory [`UserStore`] backend for sentinel-auth, intended for tests
//! and local development. Uniqueness of the external identity key is
//! enforced atomically under the write lock, so concurrent provisioning
//! races resolve to exactly one record and one conflict, the same contract
//! a relational backend provides through a unique constraint.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use sentinel_auth::{ProfileUpdate, StoreError, UserRecord, UserStore};

/// In-memory user store keyed by external identity.
#[derive(Default)]
pub struct MemoryUserStore {
    /// Records keyed by external id.
    users: RwLock<HashMap<String, UserRecord>>,
    /// Number of profile writes issued, observable by tests asserting that
    /// unchanged re-authentication performs no write.
    update_calls: AtomicUsize,
}

impl MemoryUserStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record directly, replacing any record with the same
    /// external id. For test seeding.
    pub async fn seed(&self, user: UserRecord) {
        let mut users = self.users.write().await;
        users.insert(user.external_id.clone(), user);
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Returns `true` if the store holds no records.
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    /// Number of `update_profile` calls issued so far.
    #[must_use]
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(external_id).cloned())
    }

    async fn create(&self, user: &UserRecord) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.external_id) {
            return Err(StoreError::Conflict);
        }
        users.insert(user.external_id.clone(), user.clone());
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<(), StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        let mut users = self.users.write().await;
        let user = users
            .values_mut()
            .find(|u| u.id == user_id)
            .ok_or(StoreError::NotFound)?;
        update.apply(user);
        user.updated_at = time::OffsetDateTime::now_utc();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(external_id: &str) -> UserRecord {
        UserRecord::builder(external_id, "user@example.com")
            .email("user@example.com")
            .first_name("User")
            .build()
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryUserStore::new();
        assert!(store.is_empty().await);

        store.create(&record("abc123")).await.unwrap();

        let found = store.find_by_external_id("abc123").await.unwrap().unwrap();
        assert_eq!(found.email, "user@example.com");
        assert!(store.find_by_external_id("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_external_id_conflicts() {
        let store = MemoryUserStore::new();
        store.create(&record("abc123")).await.unwrap();

        let err = store.create(&record("abc123")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_profile_applies_staged_fields() {
        let store = MemoryUserStore::new();
        let user = record("abc123");
        store.create(&user).await.unwrap();

        let update = ProfileUpdate {
            email: Some("new@example.com".to_string()),
            ..Default::default()
        };
        store.update_profile(&user.id, &update).await.unwrap();

        let found = store.find_by_external_id("abc123").await.unwrap().unwrap();
        assert_eq!(found.email, "new@example.com");
        assert_eq!(found.first_name, "User");
        assert_eq!(store.update_calls(), 1);
    }

    #[tokio::test]
    async fn test_update_profile_missing_user() {
        let store = MemoryUserStore::new();
        let err = store
            .update_profile("no-such-id", &ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_concurrent_create_one_winner() {
        use std::sync::Arc;

        let store = Arc::new(MemoryUserStore::new());
        let a = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.create(&record("race")).await })
        };
        let b = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.create(&record("race")).await })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert!(a.is_ok() != b.is_ok(), "exactly one create must win");
        assert_eq!(store.len().await, 1);
    }
}
