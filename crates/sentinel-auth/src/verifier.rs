//! Token signature and claim verification.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation, decode, decode_header};

use crate::claims::EntraClaims;
use crate::config::EntraConfig;
use crate::error::AuthError;
use crate::jwks::{SigningKeyCache, SigningKeyCacheConfig};

/// Verifies Entra bearer tokens against the tenant's published keys.
///
/// Verification is a fixed pipeline: decode the header (without trusting
/// anything in it beyond the `kid`), resolve the matching public key from
/// the discovery endpoint, then validate signature, expiry, and audience
/// under RS256, the algorithm Entra signs access tokens with.
#[derive(Debug)]
pub struct TokenVerifier {
    keys: SigningKeyCache,
    client_id: String,
    leeway_secs: u64,
}

impl TokenVerifier {
    /// Creates a verifier for the configured tenant and client.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the config is incomplete.
    pub fn new(config: &EntraConfig) -> Result<Self, AuthError> {
        config.validate()?;
        let keys = SigningKeyCache::new(
            config.keys_url()?,
            config.request_timeout,
            config.allow_http,
            SigningKeyCacheConfig::default(),
        )?;

        Ok(Self {
            keys,
            client_id: config.client_id.clone(),
            leeway_secs: config.clock_skew_tolerance.as_secs(),
        })
    }

    /// Verifies a raw bearer token and returns its claims.
    ///
    /// # Errors
    ///
    /// - `AuthError::TokenMalformed` if the token cannot be decoded.
    /// - `AuthError::UnknownSigningKey` if the `kid` is missing or matches
    ///   no published key.
    /// - `AuthError::KeyDiscoveryUnavailable` if the key set cannot be fetched.
    /// - `AuthError::TokenExpired` / `AuthError::VerificationFailed` when
    ///   validation of the matched key fails.
    pub async fn verify(&self, token: &str) -> Result<EntraClaims, AuthError> {
        // Header is read unverified, only to pick the key.
        let header = decode_header(token)
            .map_err(|e| AuthError::malformed(format!("undecodable header: {e}")))?;

        let Some(kid) = header.kid else {
            tracing::debug!("token header carries no kid");
            return Err(AuthError::unknown_key(None));
        };

        let decoding_key = self.keys.resolve(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.client_id]);
        validation.leeway = self.leeway_secs;

        let token_data =
            decode::<EntraClaims>(token, &decoding_key, &validation).map_err(map_jwt_error)?;

        tracing::debug!(
            oid = token_data.claims.oid.as_deref().unwrap_or(""),
            "token verified"
        );

        Ok(token_data.claims)
    }

    /// Access to the underlying key cache (for invalidation in tests or on
    /// operator demand).
    #[must_use]
    pub fn key_cache(&self) -> &SigningKeyCache {
        &self.keys
    }
}

/// Folds the JWT library's error kinds into the closed failure taxonomy.
///
/// Nothing escapes unmapped: anything unanticipated becomes `Internal`,
/// which still renders as an authentication failure.
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidSignature => {
            AuthError::verification("token signature does not match the signing key".to_string())
        }
        ErrorKind::InvalidAudience => {
            AuthError::verification("audience does not match the configured client id".to_string())
        }
        ErrorKind::ImmatureSignature => {
            AuthError::verification("token is not yet valid".to_string())
        }
        ErrorKind::InvalidAlgorithm => {
            AuthError::verification("token algorithm is not RS256".to_string())
        }
        ErrorKind::InvalidToken
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::MissingRequiredClaim(_) => AuthError::malformed(err.to_string()),
        _ => AuthError::internal(err.to_string()),
    }
}
