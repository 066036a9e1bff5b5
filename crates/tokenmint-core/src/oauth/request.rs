//! Request abstraction consumed by the issuance core.
//!
//! The HTTP layer parses the incoming authorization or token request into
//! a [`Form`], attaches the authenticated [`OpenIdSession`], and hands the
//! result to the issuance helper through the [`Request`] trait.

use std::collections::BTreeMap;

use time::OffsetDateTime;

use crate::openid::session::OpenIdSession;

/// Form parameters of an OAuth 2.0 request.
///
/// Keys may carry several values; [`Form::get`] returns the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    values: BTreeMap<String, Vec<String>>,
}

impl Form {
    /// Creates an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` body or query string.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut form = Self::new();
        for (key, value) in url::form_urlencoded::parse(input.as_bytes()) {
            form.add(key.into_owned(), value.into_owned());
        }
        form
    }

    /// Returns the first value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns every value for `key`.
    #[must_use]
    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replaces all values for `key` with `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), vec![value.into()]);
    }

    /// Appends `value` to the values for `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    /// Removes every value for `key`.
    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    /// Returns `true` if the form has no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Form
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = Self::new();
        for (key, value) in iter {
            form.add(key, value);
        }
        form
    }
}

/// A request the issuance core can mint tokens for.
pub trait Request: Send + Sync {
    /// Returns the first form value for `key`, if any.
    fn form_value(&self, key: &str) -> Option<&str>;

    /// Returns the session attached to this request.
    fn session(&self) -> &OpenIdSession;

    /// Returns the ID of the client the request was made by.
    fn client_id(&self) -> &str;

    /// Returns when the request was received.
    fn requested_at(&self) -> OffsetDateTime;
}

/// Concrete authorization / token request.
#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    /// Parsed form parameters.
    pub form: Form,

    /// Session attached by the authentication layer.
    pub session: OpenIdSession,

    /// Requesting client's ID.
    pub client_id: String,

    /// When the request was received.
    pub requested_at: OffsetDateTime,
}

impl AuthorizeRequest {
    /// Creates a request for `client_id` with an empty form and session.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            form: Form::new(),
            session: OpenIdSession::default(),
            client_id: client_id.into(),
            requested_at: OffsetDateTime::now_utc(),
        }
    }

    /// Sets the form parameters.
    #[must_use]
    pub fn with_form(mut self, form: Form) -> Self {
        self.form = form;
        self
    }

    /// Attaches a session.
    #[must_use]
    pub fn with_session(mut self, session: OpenIdSession) -> Self {
        self.session = session;
        self
    }

    /// Replaces the attached session.
    pub fn set_session(&mut self, session: OpenIdSession) {
        self.session = session;
    }
}

impl Request for AuthorizeRequest {
    fn form_value(&self, key: &str) -> Option<&str> {
        self.form.get(key)
    }

    fn session(&self) -> &OpenIdSession {
        &self.session
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn requested_at(&self) -> OffsetDateTime {
        self.requested_at
    }
}
