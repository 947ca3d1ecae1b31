//! Bridge configuration.
//!
//! Tenant and client identifiers are passed explicitly instead of being read
//! from ambient settings, so the bridge can be constructed with fake values
//! in tests.

use std::time::Duration;

use url::Url;

use crate::error::AuthError;

/// Default authority host for Microsoft Entra External ID.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Configuration for the Entra External ID token bridge.
#[derive(Debug, Clone)]
pub struct EntraConfig {
    /// The Entra tenant identifier. Required.
    pub tenant_id: String,

    /// The application (client) id tokens must be issued to. Required,
    /// checked against the token's `aud` claim.
    pub client_id: String,

    /// Authority base URL the discovery endpoint hangs off of
    /// (default: `https://login.microsoftonline.com`).
    pub authority: String,

    /// HTTP request timeout for key discovery (default: 10 seconds).
    pub request_timeout: Duration,

    /// Clock skew tolerance for token validation (default: 60 seconds).
    pub clock_skew_tolerance: Duration,

    /// Whether to allow HTTP (non-HTTPS) discovery endpoints.
    /// This should only be enabled for testing.
    pub allow_http: bool,
}

impl EntraConfig {
    /// Creates a configuration for the given tenant and client.
    #[must_use]
    pub fn new(tenant_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            authority: DEFAULT_AUTHORITY.to_string(),
            request_timeout: Duration::from_secs(10),
            clock_skew_tolerance: Duration::from_secs(60),
            allow_http: false,
        }
    }

    /// Sets the authority base URL.
    #[must_use]
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    /// Sets the HTTP request timeout for key discovery.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the clock skew tolerance for token validation.
    #[must_use]
    pub fn with_clock_skew_tolerance(mut self, tolerance: Duration) -> Self {
        self.clock_skew_tolerance = tolerance;
        self
    }

    /// Allows HTTP discovery endpoints.
    ///
    /// # Warning
    ///
    /// This should only be used for testing.
    #[must_use]
    pub fn with_allow_http(mut self, allow: bool) -> Self {
        self.allow_http = allow;
        self
    }

    /// Validates the configuration.
    ///
    /// A bridge with a missing tenant or client id must fail at construction
    /// rather than silently skip verification.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if a required field is empty or
    /// the authority is not a valid URL.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.tenant_id.trim().is_empty() {
            return Err(AuthError::configuration("tenant_id must not be empty"));
        }
        if self.client_id.trim().is_empty() {
            return Err(AuthError::configuration("client_id must not be empty"));
        }
        self.keys_url()?;
        Ok(())
    }

    /// Builds the signing-key discovery URL for the configured tenant:
    /// `{authority}/{tenant_id}/discovery/v2.0/keys`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the authority cannot be parsed
    /// as a URL.
    pub fn keys_url(&self) -> Result<Url, AuthError> {
        let raw = format!(
            "{}/{}/discovery/v2.0/keys",
            self.authority.trim_end_matches('/'),
            self.tenant_id
        );
        Url::parse(&raw)
            .map_err(|e| AuthError::configuration(format!("invalid authority URL: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = EntraConfig::new("tenant-1", "client-1");
        assert_eq!(config.authority, DEFAULT_AUTHORITY);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.clock_skew_tolerance, Duration::from_secs(60));
        assert!(!config.allow_http);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_keys_url() {
        let config = EntraConfig::new("tenant-1", "client-1");
        assert_eq!(
            config.keys_url().unwrap().as_str(),
            "https://login.microsoftonline.com/tenant-1/discovery/v2.0/keys"
        );

        // Trailing slash on the authority is tolerated
        let config = config.with_authority("https://example.com/");
        assert_eq!(
            config.keys_url().unwrap().as_str(),
            "https://example.com/tenant-1/discovery/v2.0/keys"
        );
    }

    #[test]
    fn test_validate_rejects_empty_ids() {
        let config = EntraConfig::new("", "client-1");
        assert!(matches!(
            config.validate(),
            Err(AuthError::Configuration { .. })
        ));

        let config = EntraConfig::new("tenant-1", "  ");
        assert!(matches!(
            config.validate(),
            Err(AuthError::Configuration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_authority() {
        let config = EntraConfig::new("tenant-1", "client-1").with_authority("not a url");
        assert!(matches!(
            config.validate(),
            Err(AuthError::Configuration { .. })
        ));
    }

    #[test]
    fn test_config_builder() {
        let config = EntraConfig::new("t", "c")
            .with_request_timeout(Duration::from_secs(5))
            .with_clock_skew_tolerance(Duration::from_secs(0))
            .with_allow_http(true);

        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.clock_skew_tolerance, Duration::from_secs(0));
        assert!(config.allow_http);
    }
}
