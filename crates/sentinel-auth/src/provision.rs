//! Identity reconciliation: mapping verified claims to a local user.
//!
//! First sighting of an external identity provisions a record just in time;
//! later sightings synchronize the profile fields the provider is
//! authoritative for (email, first name, last name). The local username is
//! chosen once at creation and never rewritten here.

use std::sync::Arc;

use crate::claims::EntraClaims;
use crate::error::AuthError;
use crate::user::{ProfileUpdate, StoreError, UserRecord, UserStore};

/// The action taken while resolving a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// An existing record matched and nothing needed updating.
    Unchanged,
    /// An existing record matched and changed profile fields were written.
    Synchronized,
    /// A new record was created (just-in-time provisioning).
    Provisioned,
}

impl std::fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unchanged => write!(f, "unchanged"),
            Self::Synchronized => write!(f, "synchronized"),
            Self::Provisioned => write!(f, "provisioned"),
        }
    }
}

/// Resolves verified claims to a [`UserRecord`].
pub struct IdentityReconciler {
    store: Arc<dyn UserStore>,
    tenant_id: String,
}

impl IdentityReconciler {
    /// Creates a reconciler over the given store, tagging new records with
    /// the configured tenant.
    #[must_use]
    pub fn new(store: Arc<dyn UserStore>, tenant_id: impl Into<String>) -> Self {
        Self {
            store,
            tenant_id: tenant_id.into(),
        }
    }

    /// Resolves the user for a set of verified claims.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidClaims` when the payload has neither `oid` nor `sub`.
    /// - `AuthError::UserInactive` when the resolved record is deactivated.
    /// - `AuthError::Storage` when the store fails.
    pub async fn resolve(&self, claims: &EntraClaims) -> Result<UserRecord, AuthError> {
        let external_id = claims.external_id().ok_or(AuthError::InvalidClaims)?;

        let (user, action) = match self.store.find_by_external_id(external_id).await? {
            Some(existing) => self.synchronize(existing, claims).await?,
            None => self.provision(external_id, claims).await?,
        };

        // A deactivated account never authenticates, valid token or not.
        if !user.active {
            tracing::warn!(external_id, "inactive user presented a valid token");
            return Err(AuthError::UserInactive);
        }

        tracing::debug!(external_id, username = %user.username, %action, "identity resolved");
        Ok(user)
    }

    /// Creates a record for a previously unseen identity.
    ///
    /// Two concurrent first sightings race on the store's unique constraint;
    /// the loser gets `Conflict` and adopts the winner's record.
    async fn provision(
        &self,
        external_id: &str,
        claims: &EntraClaims,
    ) -> Result<(UserRecord, ReconcileAction), AuthError> {
        let username = claims
            .email
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(claims
                .preferred_username
                .as_deref()
                .filter(|s| !s.is_empty()))
            .unwrap_or(external_id);

        let user = UserRecord::builder(external_id, username)
            .email(claims.email.clone().unwrap_or_default())
            .first_name(claims.given_name.clone().unwrap_or_default())
            .last_name(claims.family_name.clone().unwrap_or_default())
            .tenant(self.tenant_id.clone())
            .build();

        match self.store.create(&user).await {
            Ok(()) => {
                tracing::info!(external_id, username = %user.username, "provisioned user");
                Ok((user, ReconcileAction::Provisioned))
            }
            Err(StoreError::Conflict) => {
                tracing::debug!(external_id, "lost provisioning race, adopting existing record");
                let existing = self
                    .store
                    .find_by_external_id(external_id)
                    .await?
                    .ok_or_else(|| {
                        AuthError::storage("user vanished after provisioning conflict")
                    })?;
                self.synchronize(existing, claims).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stages whichever of email/first/last name the claims changed, and
    /// writes them in one operation, or skips the write entirely.
    async fn synchronize(
        &self,
        mut user: UserRecord,
        claims: &EntraClaims,
    ) -> Result<(UserRecord, ReconcileAction), AuthError> {
        let update = stage_changes(&user, claims);
        if update.is_empty() {
            return Ok((user, ReconcileAction::Unchanged));
        }

        self.store.update_profile(&user.id, &update).await?;
        update.apply(&mut user);
        tracing::debug!(external_id = %user.external_id, "synchronized profile fields");
        Ok((user, ReconcileAction::Synchronized))
    }
}

/// Computes the changed-field set: a field is staged only when the claim is
/// non-empty AND differs from the stored value.
fn stage_changes(user: &UserRecord, claims: &EntraClaims) -> ProfileUpdate {
    let changed = |stored: &str, claim: &Option<String>| -> Option<String> {
        claim
            .as_deref()
            .filter(|c| !c.is_empty() && *c != stored)
            .map(ToString::to_string)
    };

    ProfileUpdate {
        email: changed(&user.email, &claims.email),
        first_name: changed(&user.first_name, &claims.given_name),
        last_name: changed(&user.last_name, &claims.family_name),
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        // Conflict is handled inside the reconciler; one slipping through
        // anywhere else is a storage-level failure.
        AuthError::storage(err.to_string())
    }
}
