//! Verified token claims.

use serde::{Deserialize, Deserializer, Serialize};

/// Claims carried by an Entra External ID access token, after signature
/// verification.
///
/// Entra puts the stable object id in `oid`; `sub` is pairwise per
/// application. Profile fields are all optional; guest accounts routinely
/// lack `email`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntraClaims {
    /// Object id of the directory account (stable across applications).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,

    /// Subject identifier (pairwise per application).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Given (first) name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    /// Family (last) name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    /// Preferred username, often the UPN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    /// Tenant id the token was issued from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,

    /// Expiry as a Unix timestamp.
    pub exp: i64,

    /// Audience; a string or an array of strings on the wire.
    #[serde(deserialize_with = "deserialize_audience")]
    pub aud: Vec<String>,
}

impl EntraClaims {
    /// The external identity key for this token: `oid` preferred, `sub` as
    /// the fallback. `None` when the payload carries neither.
    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        self.oid
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.sub.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Custom deserializer for audience which can be a string or array.
fn deserialize_audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Audience {
        Single(String),
        Multiple(Vec<String>),
    }

    match Audience::deserialize(deserializer)? {
        Audience::Single(aud) => Ok(vec![aud]),
        Audience::Multiple(auds) => Ok(auds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_string_audience() {
        let claims: EntraClaims = serde_json::from_value(serde_json::json!({
            "oid": "abc123",
            "sub": "pairwise-sub",
            "email": "a@x.com",
            "given_name": "A",
            "family_name": "X",
            "exp": 4102444800i64,
            "aud": "client-id"
        }))
        .unwrap();

        assert_eq!(claims.aud, vec!["client-id"]);
        assert_eq!(claims.external_id(), Some("abc123"));
    }

    #[test]
    fn test_claims_array_audience() {
        let claims: EntraClaims = serde_json::from_value(serde_json::json!({
            "sub": "sub-1",
            "exp": 4102444800i64,
            "aud": ["client-1", "client-2"]
        }))
        .unwrap();

        assert_eq!(claims.aud, vec!["client-1", "client-2"]);
    }

    #[test]
    fn test_external_id_prefers_oid() {
        let claims: EntraClaims = serde_json::from_value(serde_json::json!({
            "oid": "object-id",
            "sub": "subject-id",
            "exp": 0,
            "aud": "c"
        }))
        .unwrap();
        assert_eq!(claims.external_id(), Some("object-id"));
    }

    #[test]
    fn test_external_id_falls_back_to_sub() {
        let claims: EntraClaims = serde_json::from_value(serde_json::json!({
            "sub": "subject-id",
            "exp": 0,
            "aud": "c"
        }))
        .unwrap();
        assert_eq!(claims.external_id(), Some("subject-id"));
    }

    #[test]
    fn test_external_id_missing() {
        let claims: EntraClaims = serde_json::from_value(serde_json::json!({
            "exp": 0,
            "aud": "c"
        }))
        .unwrap();
        assert_eq!(claims.external_id(), None);

        // Empty strings do not count as identifiers either
        let claims: EntraClaims = serde_json::from_value(serde_json::json!({
            "oid": "",
            "sub": "",
            "exp": 0,
            "aud": "c"
        }))
        .unwrap();
        assert_eq!(claims.external_id(), None);
    }
}
