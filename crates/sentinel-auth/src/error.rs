//! Authentication error types.
//!
//! Every way an authentication attempt can fail is a variant here. A missing
//! credential is deliberately *not* an error: the authenticator returns
//! `Ok(None)` in that case so the routing layer can try other schemes.

use std::fmt;

/// Errors that can occur while validating a bearer token and resolving
/// the local user it belongs to.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The provider's signing-key discovery endpoint could not be reached
    /// or returned an unusable response. Fails closed.
    #[error("Key discovery unavailable: {message}")]
    KeyDiscoveryUnavailable {
        /// Description of the discovery failure.
        message: String,
    },

    /// The token's `kid` header is missing or does not match any key in the
    /// fetched signing-key set.
    #[error("Invalid token signature")]
    UnknownSigningKey {
        /// The key id the token declared, if any.
        kid: Option<String>,
    },

    /// The token's `exp` claim is in the past.
    #[error("Token has expired")]
    TokenExpired,

    /// The token could not be decoded at all (wrong segment count, bad
    /// base64, bad JSON).
    #[error("Invalid token: {message}")]
    TokenMalformed {
        /// Description of what failed to decode.
        message: String,
    },

    /// The token decoded but its signature or a validated claim (audience)
    /// did not check out against the matched key.
    #[error("Token verification failed: {message}")]
    VerificationFailed {
        /// Description of the signature/claim mismatch.
        message: String,
    },

    /// The verified payload is missing the claims we need (neither `oid`
    /// nor `sub` present).
    #[error("Invalid token payload")]
    InvalidClaims,

    /// The resolved local user exists but is deactivated.
    #[error("User is inactive")]
    UserInactive,

    /// The request lacks valid authentication credentials. Raised by the
    /// required extractor, never by the authenticator itself.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of why the request is unauthorized.
        message: String,
    },

    /// The user store failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The bridge configuration is invalid (empty tenant or client id).
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// Catch-all for anything unanticipated. Still surfaces as an
    /// authentication failure, never as an unhandled error.
    #[error("Authentication failed: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `KeyDiscoveryUnavailable` error.
    #[must_use]
    pub fn key_discovery(message: impl Into<String>) -> Self {
        Self::KeyDiscoveryUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new `UnknownSigningKey` error.
    #[must_use]
    pub fn unknown_key(kid: impl Into<Option<String>>) -> Self {
        Self::UnknownSigningKey { kid: kid.into() }
    }

    /// Creates a new `TokenMalformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::TokenMalformed {
            message: message.into(),
        }
    }

    /// Creates a new `VerificationFailed` error.
    #[must_use]
    pub fn verification(message: impl Into<String>) -> Self {
        Self::VerificationFailed {
            message: message.into(),
        }
    }

    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this failure was caused by the presented token
    /// itself (as opposed to our infrastructure).
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownSigningKey { .. }
                | Self::TokenExpired
                | Self::TokenMalformed { .. }
                | Self::VerificationFailed { .. }
                | Self::InvalidClaims
        )
    }

    /// Returns `true` if this failure originated in an external collaborator
    /// (key discovery endpoint or user store).
    #[must_use]
    pub fn is_external_error(&self) -> bool {
        matches!(
            self,
            Self::KeyDiscoveryUnavailable { .. } | Self::Storage { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::KeyDiscoveryUnavailable { .. } => ErrorCategory::Discovery,
            Self::UnknownSigningKey { .. }
            | Self::TokenExpired
            | Self::TokenMalformed { .. }
            | Self::VerificationFailed { .. }
            | Self::InvalidClaims => ErrorCategory::Token,
            Self::UserInactive | Self::Unauthorized { .. } => ErrorCategory::Authentication,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of authentication errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Signing-key discovery errors.
    Discovery,
    /// Token decoding/validation errors.
    Token,
    /// Authentication outcome errors (inactive user, missing credential).
    Authentication,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discovery => write!(f, "discovery"),
            Self::Token => write!(f, "token"),
            Self::Authentication => write!(f, "authentication"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthError::key_discovery("connection refused");
        assert_eq!(
            err.to_string(),
            "Key discovery unavailable: connection refused"
        );

        let err = AuthError::unknown_key("key-1".to_string());
        assert_eq!(err.to_string(), "Invalid token signature");

        let err = AuthError::TokenExpired;
        assert_eq!(err.to_string(), "Token has expired");

        let err = AuthError::InvalidClaims;
        assert_eq!(err.to_string(), "Invalid token payload");

        let err = AuthError::UserInactive;
        assert_eq!(err.to_string(), "User is inactive");
    }

    #[test]
    fn test_error_predicates() {
        assert!(AuthError::TokenExpired.is_token_error());
        assert!(AuthError::unknown_key(None).is_token_error());
        assert!(AuthError::InvalidClaims.is_token_error());
        assert!(!AuthError::UserInactive.is_token_error());

        assert!(AuthError::key_discovery("down").is_external_error());
        assert!(AuthError::storage("down").is_external_error());
        assert!(!AuthError::TokenExpired.is_external_error());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            AuthError::key_discovery("x").category(),
            ErrorCategory::Discovery
        );
        assert_eq!(AuthError::TokenExpired.category(), ErrorCategory::Token);
        assert_eq!(
            AuthError::UserInactive.category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            AuthError::storage("x").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(
            AuthError::configuration("x").category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Discovery.to_string(), "discovery");
        assert_eq!(ErrorCategory::Token.to_string(), "token");
        assert_eq!(ErrorCategory::Internal.to_string(), "internal");
    }
}
