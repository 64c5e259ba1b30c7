//! Core data types shared by every Warden layer.
//!
//! Session data is deliberately loose: a token endpoint may return any
//! fields it likes, and those fields must survive a round-trip through
//! storage untouched. So [`SessionData`] wraps a JSON object map and only
//! adds typed accessors for the handful of fields Warden understands.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// SessionData
// ---------------------------------------------------------------------------

/// Opaque key/value session record produced by an authenticator.
///
/// Recognized fields:
///
/// | Key | Meaning |
/// |---|---|
/// | `access_token` | bearer credential (non-empty when authenticated) |
/// | `refresh_token` | credential exchangeable for a new access token |
/// | `expires_in` | lifetime in whole seconds, as sent by the server |
/// | `expires_at` | absolute expiry in epoch milliseconds, derived locally |
///
/// `#[serde(transparent)]` makes this serialize as the bare JSON object,
/// not as `{ "0": { ... } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionData(Map<String, Value>);

impl SessionData {
    pub const ACCESS_TOKEN: &'static str = "access_token";
    pub const REFRESH_TOKEN: &'static str = "refresh_token";
    pub const EXPIRES_IN: &'static str = "expires_in";
    pub const EXPIRES_AT: &'static str = "expires_at";

    /// Creates an empty record.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builds a record from a JSON value.
    ///
    /// Anything that isn't a JSON object yields an empty record, which
    /// then fails the access-token check downstream.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::new(),
        }
    }

    /// Returns the access token, if present as a string.
    pub fn access_token(&self) -> Option<&str> {
        self.get_str(Self::ACCESS_TOKEN)
    }

    /// Returns the refresh token, if present as a string.
    pub fn refresh_token(&self) -> Option<&str> {
        self.get_str(Self::REFRESH_TOKEN)
    }

    /// Token lifetime in whole seconds.
    pub fn expires_in(&self) -> Option<i64> {
        self.get_i64(Self::EXPIRES_IN)
    }

    /// Absolute expiry in epoch milliseconds.
    pub fn expires_at(&self) -> Option<i64> {
        self.get_i64(Self::EXPIRES_AT)
    }

    /// `true` when the record carries a non-empty `access_token` string.
    pub fn has_access_token(&self) -> bool {
        self.access_token().is_some_and(|t| !t.is_empty())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Inserts (or replaces) a field, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Consuming variant of [`insert`](Self::insert) for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns `self` layered over `defaults`: every key in `self` wins,
    /// keys only present in `defaults` are kept.
    #[must_use]
    pub fn merged_over(self, defaults: SessionData) -> Self {
        let mut merged = defaults.0;
        merged.extend(self.0);
        Self(merged)
    }

    /// Borrows the underlying JSON map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    // Servers send integers, but some send numeric strings ("3600"). A
    // float that slipped through is truncated rather than ignored.
    fn get_i64(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
            }
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for SessionData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<SessionData> for Value {
    fn from(data: SessionData) -> Self {
        Value::Object(data.0)
    }
}

// ---------------------------------------------------------------------------
// TaggedSession / PersistedSession
// ---------------------------------------------------------------------------

/// Session data tagged with the name of the authenticator that produced it.
///
/// On the wire this is a single flat object: `{ "authenticator": "x",
/// "access_token": "t", ... }`. `#[serde(flatten)]` merges the data fields
/// into the same level as the tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggedSession {
    #[serde(default)]
    pub authenticator: Option<String>,
    #[serde(flatten)]
    pub data: SessionData,
}

impl TaggedSession {
    pub fn new(authenticator: Option<String>, data: SessionData) -> Self {
        Self { authenticator, data }
    }
}

/// The blob handed to (and read back from) a storage backend.
///
/// `{ "authenticated": { "authenticator": ..., ...data } }`, or `{}` when
/// nothing was ever persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticated: Option<TaggedSession>,
}

impl PersistedSession {
    /// A blob with no session in it.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(authenticator: Option<String>, data: SessionData) -> Self {
        Self {
            authenticated: Some(TaggedSession::new(authenticator, data)),
        }
    }

    /// Splits the blob into the authenticator tag and the remaining data.
    ///
    /// A missing `authenticated` key yields `(None, {})`.
    pub fn into_parts(self) -> (Option<String>, SessionData) {
        match self.authenticated {
            Some(TaggedSession {
                authenticator,
                data,
            }) => (authenticator, data),
            None => (None, SessionData::new()),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(self).map_err(ProtocolError::Encode)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(bytes).map_err(ProtocolError::Decode)
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// OAuth2 scope list (RFC 6749 §3.3).
///
/// Accepts a single value or a sequence; both normalize to one
/// space-joined request parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ScopeRepr", into = "Vec<String>")]
pub struct Scope(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum ScopeRepr {
    One(String),
    Many(Vec<String>),
}

impl From<ScopeRepr> for Scope {
    fn from(repr: ScopeRepr) -> Self {
        match repr {
            ScopeRepr::One(s) => Self(vec![s]),
            ScopeRepr::Many(v) => Self(v),
        }
    }
}

impl From<Scope> for Vec<String> {
    fn from(scope: Scope) -> Self {
        scope.0
    }
}

impl Scope {
    /// An empty scope: no `scope` parameter is sent.
    pub fn none() -> Self {
        Self::default()
    }

    /// The `scope` request parameter, or `None` when it would be empty.
    pub fn to_param(&self) -> Option<String> {
        let joined = self.0.join(" ");
        if joined.is_empty() { None } else { Some(joined) }
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for Scope {
    fn from(s: &str) -> Self {
        Self(vec![s.to_string()])
    }
}

impl From<String> for Scope {
    fn from(s: String) -> Self {
        Self(vec![s])
    }
}

impl<S: Into<String>> From<Vec<S>> for Scope {
    fn from(v: Vec<S>) -> Self {
        Self(v.into_iter().map(Into::into).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Scope {
    fn from(v: [&str; N]) -> Self {
        Self(v.iter().map(|s| s.to_string()).collect())
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Resource owner credentials for the password grant.
///
/// `headers` are extra request headers some backends need (a 2FA
/// challenge response, a tenant hint). They are sent with the token
/// request only.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub identification: String,
    pub password: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

impl Credentials {
    pub fn new(identification: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identification: identification.into(),
            password: password.into(),
            scope: Scope::none(),
            headers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<Scope>) -> Self {
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

// Hand-written so the password never ends up in a log line.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identification", &self.identification)
            .field("password", &"<redacted>")
            .field("scope", &self.scope)
            .field("headers", &self.headers.len())
            .finish()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> SessionData {
        SessionData::from_value(value)
    }

    // =====================================================================
    // SessionData
    // =====================================================================

    #[test]
    fn test_has_access_token_empty_string_is_false() {
        assert!(!data(json!({ "access_token": "" })).has_access_token());
        assert!(!data(json!({})).has_access_token());
        assert!(!data(json!({ "access_token": 42 })).has_access_token());
        assert!(data(json!({ "access_token": "t" })).has_access_token());
    }

    #[test]
    fn test_from_value_non_object_is_empty() {
        assert!(SessionData::from_value(json!("token")).is_empty());
        assert!(SessionData::from_value(json!([1, 2])).is_empty());
    }

    #[test]
    fn test_expires_accessors_read_integers() {
        let d = data(json!({ "expires_in": 100, "expires_at": 1_700_000_000_000_i64 }));
        assert_eq!(d.expires_in(), Some(100));
        assert_eq!(d.expires_at(), Some(1_700_000_000_000));
    }

    #[test]
    fn test_expires_in_numeric_string_is_read() {
        assert_eq!(data(json!({ "expires_in": "3600" })).expires_in(), Some(3600));
        assert_eq!(data(json!({ "expires_in": " 90.5 " })).expires_in(), Some(90));
        assert_eq!(data(json!({ "expires_in": "soon" })).expires_in(), None);
        assert_eq!(data(json!({ "expires_in": true })).expires_in(), None);
    }

    #[test]
    fn test_merged_over_prefers_self_and_keeps_defaults() {
        let defaults = data(json!({ "expires_in": 10, "refresh_token": "old" }));
        let fresh = data(json!({ "access_token": "new", "expires_in": 20 }));

        let merged = fresh.merged_over(defaults);

        assert_eq!(merged.access_token(), Some("new"));
        assert_eq!(merged.expires_in(), Some(20));
        assert_eq!(merged.refresh_token(), Some("old"));
    }

    // =====================================================================
    // PersistedSession
    // =====================================================================

    #[test]
    fn test_persisted_session_flattens_authenticator_tag() {
        let blob = PersistedSession::new(
            Some("x".into()),
            data(json!({ "access_token": "t" })),
        );

        let value = serde_json::to_value(&blob).unwrap();

        assert_eq!(
            value,
            json!({ "authenticated": { "authenticator": "x", "access_token": "t" } })
        );
    }

    #[test]
    fn test_persisted_session_empty_blob_has_no_session() {
        let blob = PersistedSession::from_json(b"{}").unwrap();

        assert_eq!(blob, PersistedSession::empty());
        let (name, data) = blob.into_parts();
        assert!(name.is_none());
        assert!(data.is_empty());
    }

    #[test]
    fn test_persisted_session_into_parts_strips_tag() {
        let blob = PersistedSession::from_json(
            br#"{"authenticated":{"authenticator":"x","access_token":"t"}}"#,
        )
        .unwrap();

        let (name, data) = blob.into_parts();

        assert_eq!(name.as_deref(), Some("x"));
        assert_eq!(data, SessionData::new().with("access_token", "t"));
    }

    // =====================================================================
    // Scope
    // =====================================================================

    #[test]
    fn test_scope_single_and_many_normalize() {
        assert_eq!(Scope::from("public").to_param().as_deref(), Some("public"));
        assert_eq!(
            Scope::from(["public", "private"]).to_param().as_deref(),
            Some("public private")
        );
        assert_eq!(Scope::none().to_param(), None);
        assert_eq!(Scope::from("").to_param(), None);
    }

    #[test]
    fn test_scope_deserializes_from_string_or_list() {
        let one: Scope = serde_json::from_value(json!("public")).unwrap();
        let many: Scope = serde_json::from_value(json!(["a", "b"])).unwrap();

        assert_eq!(one, Scope::from("public"));
        assert_eq!(many, Scope::from(["a", "b"]));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("u", "hunter2");
        let printed = format!("{creds:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }
}
