//! # sentinel-auth
//!
//! Microsoft Entra External ID token bridge for the Sentinel backend.
//!
//! Accepts a bearer token issued by the tenant's identity provider,
//! validates it against the provider's rotating public signing keys, and
//! reconciles the verified identity with a local user record, provisioning
//! one just in time on first sight and keeping selected profile fields in
//! sync afterwards.
//!
//! ## Pipeline
//!
//! Each authentication attempt runs the same four stages, short-circuiting
//! to a typed [`AuthError`] on failure:
//!
//! 1. **Extract**: pull the bearer token out of the authorization header;
//!    absence is a skip (`Ok(None)`), not an error.
//! 2. **Resolve keys**: fetch the tenant's signing-key set from the
//!    discovery endpoint (cached with a bounded TTL).
//! 3. **Verify**: match the token's `kid`, validate signature, expiry,
//!    and audience under RS256.
//! 4. **Reconcile**: map the subject to a [`UserRecord`], creating or
//!    synchronizing it, and reject deactivated accounts.
//!
//! ## Modules
//!
//! - [`config`] - Tenant/client configuration
//! - [`claims`] - Verified token claims
//! - [`jwks`] - Signing-key discovery and caching
//! - [`verifier`] - Signature and claim verification
//! - [`user`] - User records and the store trait
//! - [`provision`] - Just-in-time provisioning and field synchronization
//! - [`authenticator`] - The end-to-end pipeline
//! - [`middleware`] - Axum extractors and error responses

pub mod authenticator;
pub mod claims;
pub mod config;
pub mod error;
pub mod jwks;
pub mod middleware;
pub mod provision;
pub mod user;
pub mod verifier;

pub use authenticator::{AuthSession, EntraAuthenticator, bearer_token};
pub use claims::EntraClaims;
pub use config::{DEFAULT_AUTHORITY, EntraConfig};
pub use error::{AuthError, ErrorCategory};
pub use jwks::{SigningKeyCache, SigningKeyCacheConfig};
pub use middleware::{AuthState, EntraAuth, OptionalEntraAuth};
pub use provision::{IdentityReconciler, ReconcileAction};
pub use user::{ProfileUpdate, StoreError, UserBuilder, UserRecord, UserStore};
pub use verifier::TokenVerifier;

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;
