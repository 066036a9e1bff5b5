//! OpenID Connect session and claims model.
//!
//! An [`OpenIdSession`] is filled in by the surrounding framework once the
//! end-user has authenticated, and is read (never written) by the identity
//! token strategy when a token is minted.

use jsonwebtoken::Header;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// ID token claims for OpenID Connect.
///
/// Unset optional claims are left out of the serialized payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IdTokenClaims {
    /// Subject (end-user identifier). Required.
    pub sub: String,

    /// Issuer. Filled from the signing service when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub iss: String,

    /// Audience (client ID). Filled from the request when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub aud: String,

    /// Expiration time (Unix timestamp).
    #[serde(default, skip_serializing_if = "is_unset")]
    pub exp: i64,

    /// Issued at (Unix timestamp).
    #[serde(default, skip_serializing_if = "is_unset")]
    pub iat: i64,

    /// Time the end-user authenticated (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,

    /// Nonce from the authorization request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Access token hash (hybrid and implicit flows).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_hash: Option<String>,

    /// Authorization code hash (hybrid flow).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_hash: Option<String>,

    /// Authentication context class reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acr: Option<String>,

    /// Authentication methods references.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amr: Vec<String>,

    /// Custom claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_unset(value: &i64) -> bool {
    *value == 0
}

/// Claim names backed by a dedicated [`IdTokenClaims`] field.
///
/// These never appear in [`IdTokenClaims::extra`]; a second copy under the
/// same name would produce duplicate keys in the signed payload.
pub const REGISTERED_CLAIMS: &[&str] = &[
    "sub",
    "iss",
    "aud",
    "exp",
    "iat",
    "auth_time",
    "nonce",
    "at_hash",
    "c_hash",
    "acr",
    "amr",
];

/// Returns `true` if `name` has a dedicated [`IdTokenClaims`] field.
#[must_use]
pub fn is_registered_claim(name: &str) -> bool {
    REGISTERED_CLAIMS.contains(&name)
}

impl IdTokenClaims {
    /// Creates a new builder for ID token claims.
    #[must_use]
    pub fn builder(subject: impl Into<String>) -> IdTokenClaimsBuilder {
        IdTokenClaimsBuilder::new(subject)
    }

    /// Removes custom claims that reuse a registered claim name.
    ///
    /// Returns the names that were removed.
    pub fn strip_registered_extras(&mut self) -> Vec<String> {
        let shadowing: Vec<String> = self
            .extra
            .keys()
            .filter(|name| is_registered_claim(name))
            .cloned()
            .collect();
        for name in &shadowing {
            self.extra.remove(name);
        }
        shadowing
    }
}

/// Builder for `IdTokenClaims`.
#[derive(Debug, Clone)]
pub struct IdTokenClaimsBuilder {
    claims: IdTokenClaims,
}

impl IdTokenClaimsBuilder {
    fn new(subject: impl Into<String>) -> Self {
        Self {
            claims: IdTokenClaims {
                sub: subject.into(),
                ..IdTokenClaims::default()
            },
        }
    }

    /// Sets the issuer.
    #[must_use]
    pub fn issuer(mut self, iss: impl Into<String>) -> Self {
        self.claims.iss = iss.into();
        self
    }

    /// Sets the audience.
    #[must_use]
    pub fn audience(mut self, aud: impl Into<String>) -> Self {
        self.claims.aud = aud.into();
        self
    }

    /// Sets the issued-at time.
    #[must_use]
    pub fn issued_at(mut self, iat: OffsetDateTime) -> Self {
        self.claims.iat = iat.unix_timestamp();
        self
    }

    /// Sets the expiration time.
    #[must_use]
    pub fn expires_at(mut self, exp: OffsetDateTime) -> Self {
        self.claims.exp = exp.unix_timestamp();
        self
    }

    /// Sets the authentication time.
    #[must_use]
    pub fn auth_time(mut self, auth_time: OffsetDateTime) -> Self {
        self.claims.auth_time = Some(auth_time.unix_timestamp());
        self
    }

    /// Sets the access token hash.
    #[must_use]
    pub fn access_token_hash(mut self, at_hash: impl Into<String>) -> Self {
        self.claims.at_hash = Some(at_hash.into());
        self
    }

    /// Sets the authorization code hash.
    #[must_use]
    pub fn code_hash(mut self, c_hash: impl Into<String>) -> Self {
        self.claims.c_hash = Some(c_hash.into());
        self
    }

    /// Sets the authentication context class reference.
    #[must_use]
    pub fn acr(mut self, acr: impl Into<String>) -> Self {
        self.claims.acr = Some(acr.into());
        self
    }

    /// Adds an authentication method reference.
    #[must_use]
    pub fn amr(mut self, method: impl Into<String>) -> Self {
        self.claims.amr.push(method.into());
        self
    }

    /// Adds a custom claim.
    ///
    /// Registered claim names (see [`REGISTERED_CLAIMS`]) are ignored; set
    /// those through their dedicated setters.
    #[must_use]
    pub fn claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        if !is_registered_claim(&name) {
            self.claims.extra.insert(name, value.into());
        }
        self
    }

    /// Builds the ID token claims.
    #[must_use]
    pub fn build(self) -> IdTokenClaims {
        self.claims
    }
}

/// Extra JOSE header fields merged into the signed token's header.
///
/// `alg` is never configurable here; it always follows the signing key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Headers {
    /// Key ID. Overrides the signing key's own ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Token type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,

    /// Content type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cty: Option<String>,

    /// JWK Set URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jku: Option<String>,

    /// X.509 URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5u: Option<String>,

    /// X.509 certificate SHA-1 thumbprint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x5t: Option<String>,
}

impl Headers {
    /// Creates an empty set of header overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key ID override.
    #[must_use]
    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    /// Copies every set field onto `header`, leaving the rest untouched.
    pub fn merge_into(&self, header: &mut Header) {
        if let Some(kid) = &self.kid {
            header.kid = Some(kid.clone());
        }
        if let Some(typ) = &self.typ {
            header.typ = Some(typ.clone());
        }
        if let Some(cty) = &self.cty {
            header.cty = Some(cty.clone());
        }
        if let Some(jku) = &self.jku {
            header.jku = Some(jku.clone());
        }
        if let Some(x5u) = &self.x5u {
            header.x5u = Some(x5u.clone());
        }
        if let Some(x5t) = &self.x5t {
            header.x5t = Some(x5t.clone());
        }
    }
}

/// Per-request OpenID Connect session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OpenIdSession {
    /// Claims to sign into the ID token.
    pub claims: IdTokenClaims,

    /// Header overrides for the ID token.
    pub headers: Headers,
}

impl OpenIdSession {
    /// Creates a session for `subject` with no other claims set.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            claims: IdTokenClaims::builder(subject).build(),
            headers: Headers::default(),
        }
    }

    /// Creates a session from prepared claims and headers.
    #[must_use]
    pub fn with_claims(claims: IdTokenClaims, headers: Headers) -> Self {
        Self { claims, headers }
    }

    /// Returns the session subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }
}
