//! User records and the store the embedding application implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Default datetime value for deserialization when the field is missing.
fn default_datetime() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// A locally provisioned user, keyed by the identity provider's subject.
///
/// `external_id` is set once at creation and never reassigned; the store
/// enforces its uniqueness. Profile fields mirror the provider's claims and
/// are empty strings when the provider did not supply them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Local unique identifier.
    #[serde(default)]
    pub id: String,

    /// Immutable external identity key (the provider's `oid`/`sub`).
    pub external_id: String,

    /// Local username, chosen at provisioning time and never overwritten
    /// by token synchronization.
    pub username: String,

    /// Email address from the provider.
    #[serde(default)]
    pub email: String,

    /// Given name from the provider.
    #[serde(default)]
    pub first_name: String,

    /// Family name from the provider.
    #[serde(default)]
    pub last_name: String,

    /// Tenant the identity belongs to.
    #[serde(default)]
    pub tenant: String,

    /// Whether the account may authenticate.
    pub active: bool,

    /// When the record was created.
    #[serde(default = "default_datetime", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the record was last updated.
    #[serde(default = "default_datetime", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl UserRecord {
    /// Creates an active record with a fresh UUID.
    #[must_use]
    pub fn new(external_id: impl Into<String>, username: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            external_id: external_id.into(),
            username: username.into(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            tenant: String::new(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a new record builder.
    #[must_use]
    pub fn builder(external_id: impl Into<String>, username: impl Into<String>) -> UserBuilder {
        UserBuilder {
            user: Self::new(external_id, username),
        }
    }

    /// Returns `true` if the account may authenticate.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Builder for [`UserRecord`] instances.
pub struct UserBuilder {
    user: UserRecord,
}

impl UserBuilder {
    /// Sets the local identifier.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.user.id = id.into();
        self
    }

    /// Sets the email address.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.user.email = email.into();
        self
    }

    /// Sets the given name.
    #[must_use]
    pub fn first_name(mut self, first_name: impl Into<String>) -> Self {
        self.user.first_name = first_name.into();
        self
    }

    /// Sets the family name.
    #[must_use]
    pub fn last_name(mut self, last_name: impl Into<String>) -> Self {
        self.user.last_name = last_name.into();
        self
    }

    /// Sets the tenant tag.
    #[must_use]
    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.user.tenant = tenant.into();
        self
    }

    /// Sets whether the account is active.
    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.user.active = active;
        self
    }

    /// Builds the record.
    #[must_use]
    pub fn build(self) -> UserRecord {
        self.user
    }
}

/// A partial profile update: only the staged fields are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    /// New email, if it changed.
    pub email: Option<String>,
    /// New given name, if it changed.
    pub first_name: Option<String>,
    /// New family name, if it changed.
    pub last_name: Option<String>,
}

impl ProfileUpdate {
    /// Returns `true` when no field is staged, i.e. the write can be skipped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.first_name.is_none() && self.last_name.is_none()
    }

    /// Applies the staged fields to a record in place.
    pub fn apply(&self, user: &mut UserRecord) {
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(first_name) = &self.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = last_name.clone();
        }
    }
}

/// Errors a [`UserStore`] implementation can raise.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A record with the same external identity key already exists.
    /// Raised by the backing store's unique constraint, not by an
    /// in-process check, so concurrent provisioning races are caught.
    #[error("A user with this external id already exists")]
    Conflict,

    /// The targeted record does not exist.
    #[error("User not found")]
    NotFound,

    /// The backend failed.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Persistence operations the identity reconciler needs.
///
/// Implementations must enforce uniqueness of `external_id` at the storage
/// layer: two concurrent `create` calls for the same key must result in one
/// row and one `StoreError::Conflict`.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Finds a user by external identity key.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_external_id(&self, external_id: &str)
    -> Result<Option<UserRecord>, StoreError>;

    /// Creates a new user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if a user with the same external id
    /// already exists.
    async fn create(&self, user: &UserRecord) -> Result<(), StoreError>;

    /// Writes the staged profile fields for a user, in one operation.
    ///
    /// Callers skip this entirely when the update is empty.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user does not exist.
    async fn update_profile(&self, user_id: &str, update: &ProfileUpdate)
    -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_record_new() {
        let user = UserRecord::new("abc123", "a@x.com");
        assert_eq!(user.external_id, "abc123");
        assert_eq!(user.username, "a@x.com");
        assert!(user.active);
        assert!(user.email.is_empty());
        assert!(!user.id.is_empty());
    }

    #[test]
    fn test_user_builder() {
        let user = UserRecord::builder("abc123", "a@x.com")
            .email("a@x.com")
            .first_name("A")
            .last_name("X")
            .tenant("tenant-1")
            .active(false)
            .build();

        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.first_name, "A");
        assert_eq!(user.last_name, "X");
        assert_eq!(user.tenant, "tenant-1");
        assert!(!user.is_active());
    }

    #[test]
    fn test_profile_update_empty() {
        assert!(ProfileUpdate::default().is_empty());
        assert!(
            !ProfileUpdate {
                email: Some("new@x.com".to_string()),
                ..Default::default()
            }
            .is_empty()
        );
    }

    #[test]
    fn test_profile_update_apply_touches_only_staged_fields() {
        let mut user = UserRecord::builder("abc", "user")
            .email("old@x.com")
            .first_name("Old")
            .last_name("Name")
            .build();

        let update = ProfileUpdate {
            email: Some("new@x.com".to_string()),
            first_name: None,
            last_name: None,
        };
        update.apply(&mut user);

        assert_eq!(user.email, "new@x.com");
        assert_eq!(user.first_name, "Old");
        assert_eq!(user.last_name, "Name");
    }

    #[test]
    fn test_store_error_display() {
        assert_eq!(
            StoreError::Conflict.to_string(),
            "A user with this external id already exists"
        );
        assert_eq!(StoreError::NotFound.to_string(), "User not found");
    }
}
