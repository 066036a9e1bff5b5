//! Responses the issuance core attaches tokens to.
//!
//! - [`AccessResponse`]: the JSON body returned from the token endpoint
//!   ([`AccessResponder`])
//! - [`AuthorizeResponse`]: the redirect sent back from the authorization
//!   endpoint, carrying parameters in the URI fragment ([`AuthorizeResponder`])
//!
//! The two traits are disjoint: a redirect cannot receive body fields, so an
//! identity token can never end up in a redirect query string.
//!
//! # Example
//!
//! ```ignore
//! HTTP/1.1 302 Found
//! Location: https://app.example.com/callback#
//!   id_token=eyJhbGciOiJSUzI1NiIs...
//!   &state=abc123xyz
//! ```

use serde::Serialize;
use serde_json::{Map, Value};

/// A token endpoint response that carries fields in its JSON body.
pub trait AccessResponder {
    /// Embeds a field in the JSON response body.
    fn set_extra(&mut self, key: &str, value: &str);
}

/// An authorization endpoint response that carries fields in the redirect
/// URI fragment.
pub trait AuthorizeResponder {
    /// Appends a field to the redirect URI fragment.
    ///
    /// The value is form-urlencoded when the redirect is rendered.
    fn add_fragment(&mut self, key: &str, value: &str);
}

/// Token endpoint response body (RFC 6749 Section 5.1).
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AccessResponse {
    /// The access token.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub access_token: String,

    /// Token type, usually "Bearer".
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token_type: String,

    /// Access token lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    /// Refresh token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Granted scopes (space-separated).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Additional response fields such as `id_token`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccessResponse {
    /// Creates a bearer token response.
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "Bearer".to_string(),
            ..Self::default()
        }
    }

    /// Returns an extra field as a string.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

impl AccessResponder for AccessResponse {
    fn set_extra(&mut self, key: &str, value: &str) {
        self.extra
            .insert(key.to_string(), Value::String(value.to_string()));
    }
}

/// Authorization endpoint redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeResponse {
    redirect_uri: url::Url,
    query: Vec<(String, String)>,
    fragment: Vec<(String, String)>,
}

impl AuthorizeResponse {
    /// Creates a response redirecting to `redirect_uri`.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI cannot be parsed.
    pub fn new(redirect_uri: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            redirect_uri: url::Url::parse(redirect_uri)?,
            query: Vec::new(),
            fragment: Vec::new(),
        })
    }

    /// Appends a query parameter (used for `code`/`state` in the code flow).
    pub fn add_query(&mut self, key: &str, value: &str) {
        self.query.push((key.to_string(), value.to_string()));
    }

    /// Returns the first fragment value for `key`.
    #[must_use]
    pub fn fragment(&self, key: &str) -> Option<&str> {
        self.fragment
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the first query value for `key`.
    #[must_use]
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Builds the redirect URL.
    ///
    /// Query parameters are appended to any query the registered redirect
    /// URI already carries; fragment parameters replace its fragment.
    #[must_use]
    pub fn redirect_url(&self) -> String {
        let mut url = self.redirect_uri.clone();

        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }

        if !self.fragment.is_empty() {
            let fragment = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.fragment)
                .finish();
            url.set_fragment(Some(&fragment));
        }

        url.to_string()
    }
}

impl AuthorizeResponder for AuthorizeResponse {
    fn add_fragment(&mut self, key: &str, value: &str) {
        self.fragment.push((key.to_string(), value.to_string()));
    }
}
