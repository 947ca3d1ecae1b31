//! The authentication pipeline: extract, resolve keys, verify, reconcile.

use std::sync::Arc;

use crate::claims::EntraClaims;
use crate::config::EntraConfig;
use crate::error::AuthError;
use crate::provision::IdentityReconciler;
use crate::user::{UserRecord, UserStore};
use crate::verifier::TokenVerifier;

/// Prefix an authorization header must carry for us to handle it.
const BEARER_PREFIX: &str = "Bearer ";

/// Extracts the bearer token from an authorization header value.
///
/// Returns `None` for a missing header, a different scheme, or an empty
/// token. That is the "no credential supplied" signal, which is a skip
/// rather than a failure.
#[must_use]
pub fn bearer_token(header_value: Option<&str>) -> Option<&str> {
    header_value?
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The authenticated principal: the resolved user and the raw token it
/// presented.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// The resolved local user.
    pub user: UserRecord,
    /// The raw bearer token, unchanged.
    pub token: String,
}

/// Validates Entra bearer tokens and resolves them to local users.
///
/// One instance is shared across requests; each [`authenticate`] call is a
/// self-contained request-response cycle with no state beyond the signing-key
/// cache and the user store.
///
/// [`authenticate`]: EntraAuthenticator::authenticate
pub struct EntraAuthenticator {
    verifier: TokenVerifier,
    reconciler: IdentityReconciler,
}

impl EntraAuthenticator {
    /// Creates an authenticator for the configured tenant over the given
    /// user store.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` when the tenant or client id is
    /// missing; misconfiguration fails fast here instead of silently
    /// skipping verification per request.
    pub fn new(config: EntraConfig, store: Arc<dyn UserStore>) -> Result<Self, AuthError> {
        let verifier = TokenVerifier::new(&config)?;
        let reconciler = IdentityReconciler::new(store, config.tenant_id.clone());
        Ok(Self {
            verifier,
            reconciler,
        })
    }

    /// Authenticates a request from its authorization header value.
    ///
    /// Returns `Ok(None)` when no bearer credential was supplied, letting
    /// the routing layer apply other schemes or its own policy. Every other
    /// outcome is either an authenticated session or a typed failure.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`] from key discovery, verification, or
    /// reconciliation; none of them ever lets the request proceed as
    /// authenticated.
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
    ) -> Result<Option<AuthSession>, AuthError> {
        let Some(token) = bearer_token(authorization) else {
            tracing::trace!("no bearer credential supplied, skipping");
            return Ok(None);
        };

        let claims = self.verifier.verify(token).await?;
        let user = self.reconciler.resolve(&claims).await?;

        Ok(Some(AuthSession {
            user,
            token: token.to_string(),
        }))
    }

    /// Verifies a token without touching the user store.
    ///
    /// # Errors
    ///
    /// Same failure kinds as [`authenticate`](Self::authenticate), minus the
    /// reconciliation ones.
    pub async fn verify_only(&self, token: &str) -> Result<EntraClaims, AuthError> {
        self.verifier.verify(token).await
    }

    /// Access to the verifier (e.g. for key-cache invalidation).
    #[must_use]
    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }
}
