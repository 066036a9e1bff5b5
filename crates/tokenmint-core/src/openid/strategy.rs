//! Identity token strategy.
//!
//! [`IdTokenStrategy`] is the capability the issuance helper delegates to.
//! [`DefaultIdTokenStrategy`] is the production implementation: it binds
//! the request nonce, completes the standard claims from the session and
//! request, and signs the result with the [`JwtService`] key.
//!
//! # Security
//!
//! - The signing key is shared read-only between concurrent calls
//! - Key material and minted tokens are never logged
//! - Signing failures are returned with their cause intact

use std::error::Error as StdError;
use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use crate::config::IssuanceConfig;
use crate::oauth::request::Request;
use crate::token::jwt::{JwtError, JwtService, SigningKeyPair};

/// Form parameter carrying the client's anti-replay nonce.
pub const NONCE_PARAMETER: &str = "nonce";

/// Default ID token lifetime.
pub const DEFAULT_ID_TOKEN_LIFETIME: Duration = Duration::hours(1);

/// Errors raised while assembling or signing an identity token.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// A required claim is missing or empty.
    #[error("Missing required claim: {claim}")]
    MissingClaim {
        /// Name of the missing claim.
        claim: String,
    },

    /// The claims are inconsistent.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },

    /// Signing the token failed.
    #[error("Failed to sign ID token")]
    Signing(#[from] JwtError),

    /// Failure raised by a custom strategy.
    #[error(transparent)]
    Other(Box<dyn StdError + Send + Sync + 'static>),
}

impl GenerationError {
    /// Creates a new `MissingClaim` error.
    #[must_use]
    pub fn missing_claim(claim: impl Into<String>) -> Self {
        Self::MissingClaim {
            claim: claim.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Wraps an arbitrary failure from a custom strategy.
    #[must_use]
    pub fn other(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(err))
    }

    /// Returns the innermost error in the cause chain.
    ///
    /// For `Other` this is the wrapped error itself (or its own innermost
    /// cause); for `Signing` it is the underlying `jsonwebtoken` failure.
    #[must_use]
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        match self {
            Self::Other(inner) => crate::error::innermost(inner.as_ref()),
            Self::Signing(inner) => crate::error::innermost(inner),
            _ => self,
        }
    }

    /// Returns `true` if the failure came from the signing key.
    #[must_use]
    pub fn is_key_error(&self) -> bool {
        matches!(self, Self::Signing(err) if err.is_key_error())
    }
}

/// Signs identity tokens for a request.
///
/// Implementations must be shareable across threads; the helper holds
/// them behind an `Arc`.
pub trait IdTokenStrategy: Send + Sync {
    /// Generates a compact signed identity token for `request`.
    ///
    /// # Errors
    ///
    /// Returns the claim-assembly or signing failure unchanged.
    fn generate_id_token(&self, request: &dyn Request) -> Result<String, GenerationError>;
}

/// JWT-backed identity token strategy.
#[derive(Debug, Clone)]
pub struct DefaultIdTokenStrategy {
    jwt: Arc<JwtService>,
    lifetime: Duration,
}

impl DefaultIdTokenStrategy {
    /// Creates a strategy signing with `jwt` and the default lifetime.
    #[must_use]
    pub fn new(jwt: Arc<JwtService>) -> Self {
        Self {
            jwt,
            lifetime: DEFAULT_ID_TOKEN_LIFETIME,
        }
    }

    /// Sets the lifetime applied when the session carries no `exp`.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Builds a strategy from configuration and a loaded signing key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key's algorithm does not match the
    /// configured one.
    pub fn from_config(
        config: &IssuanceConfig,
        signing_key: SigningKeyPair,
    ) -> Result<Self, crate::config::ConfigError> {
        let algorithm = config.signing.signing_algorithm()?;
        if algorithm != signing_key.algorithm {
            return Err(crate::config::ConfigError::InvalidValue(format!(
                "signing key uses {} but {} is configured",
                signing_key.algorithm, algorithm
            )));
        }

        let lifetime = Duration::try_from(config.id_token.lifetime).map_err(|e| {
            crate::config::ConfigError::InvalidValue(format!("id_token.lifetime: {}", e))
        })?;

        let jwt = Arc::new(JwtService::new(signing_key, config.issuer.clone()));
        Ok(Self::new(jwt).with_lifetime(lifetime))
    }

    /// Returns the JWT service used for signing.
    #[must_use]
    pub fn jwt_service(&self) -> &Arc<JwtService> {
        &self.jwt
    }
}

impl IdTokenStrategy for DefaultIdTokenStrategy {
    fn generate_id_token(&self, request: &dyn Request) -> Result<String, GenerationError> {
        let session = request.session();
        let mut claims = session.claims.clone();

        if claims.sub.is_empty() {
            return Err(GenerationError::missing_claim("sub"));
        }

        // The nonce always comes from this request; a value left on the
        // session from an earlier request must not be replayed.
        claims.nonce = request
            .form_value(NONCE_PARAMETER)
            .filter(|nonce| !nonce.is_empty())
            .map(str::to_string);

        let shadowing = claims.strip_registered_extras();
        if !shadowing.is_empty() {
            tracing::warn!(
                client_id = %request.client_id(),
                claims = ?shadowing,
                "dropped custom claims that reuse registered claim names"
            );
        }

        if claims.iss.is_empty() {
            claims.iss = self.jwt.issuer().to_string();
        }
        if claims.aud.is_empty() {
            claims.aud = request.client_id().to_string();
        }
        if claims.aud.is_empty() {
            return Err(GenerationError::missing_claim("aud"));
        }

        let now = OffsetDateTime::now_utc().unix_timestamp();
        if claims.iat == 0 {
            claims.iat = now;
        }
        if claims.exp == 0 {
            claims.exp = claims.iat + self.lifetime.whole_seconds();
        }
        if claims.exp <= claims.iat {
            return Err(GenerationError::invalid_claims(
                "exp must be later than iat",
            ));
        }
        if claims.auth_time.is_none() {
            claims.auth_time = Some(request.requested_at().unix_timestamp());
        }

        let mut header = self.jwt.header();
        session.headers.merge_into(&mut header);

        let token = self.jwt.encode_with_header(header, &claims)?;
        tracing::debug!(
            client_id = %claims.aud,
            nonce_bound = claims.nonce.is_some(),
            "signed ID token"
        );
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::request::{AuthorizeRequest, Form};
    use crate::openid::session::{Headers, IdTokenClaims, OpenIdSession};
    use crate::token::jwt::SigningAlgorithm;
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

    const ISSUER: &str = "https://auth.example.com";

    fn strategy() -> DefaultIdTokenStrategy {
        let key_pair = SigningKeyPair::generate_ec().unwrap();
        DefaultIdTokenStrategy::new(Arc::new(JwtService::new(key_pair, ISSUER)))
    }

    fn request(nonce: Option<&str>) -> AuthorizeRequest {
        let mut form = Form::new();
        if let Some(nonce) = nonce {
            form.set("nonce", nonce);
        }
        AuthorizeRequest::new("client-1")
            .with_form(form)
            .with_session(OpenIdSession::new("peter"))
    }

    fn payload(token: &str) -> serde_json::Value {
        let segment = token.split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn test_token_has_three_segments() {
        let token = strategy()
            .generate_id_token(&request(Some("111111111111")))
            .unwrap();

        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|s| !s.is_empty()));
    }

    #[test]
    fn test_rs256_token_verifies() {
        let key_pair = SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap();
        let strategy = DefaultIdTokenStrategy::new(Arc::new(JwtService::new(key_pair, ISSUER)));

        let token = strategy
            .generate_id_token(&request(Some("111111111111")))
            .unwrap();
        let decoded = strategy
            .jwt_service()
            .decode::<IdTokenClaims>(&token)
            .unwrap();

        assert_eq!(decoded.header.alg, jsonwebtoken::Algorithm::RS256);
        assert_eq!(decoded.claims.sub, "peter");
        assert_eq!(decoded.claims.iss, ISSUER);
        assert_eq!(decoded.claims.aud, "client-1");
        assert_eq!(decoded.claims.nonce.as_deref(), Some("111111111111"));
    }

    #[test]
    fn test_nonce_is_bound() {
        let nonce = "11111111111111111111111111111111111";
        let token = strategy().generate_id_token(&request(Some(nonce))).unwrap();
        assert_eq!(payload(&token)["nonce"], nonce);
    }

    #[test]
    fn test_absent_nonce_is_omitted() {
        let token = strategy().generate_id_token(&request(None)).unwrap();
        assert!(payload(&token).get("nonce").is_none());
    }

    #[test]
    fn test_empty_nonce_is_omitted() {
        let token = strategy().generate_id_token(&request(Some(""))).unwrap();
        assert!(payload(&token).get("nonce").is_none());
    }

    #[test]
    fn test_session_nonce_not_replayed() {
        let mut request = request(None);
        request.session.claims.nonce = Some("stale-from-previous-request".to_string());

        let token = strategy().generate_id_token(&request).unwrap();
        assert!(payload(&token).get("nonce").is_none());
    }

    #[test]
    fn test_request_nonce_replaces_session_nonce() {
        let mut request = request(Some("fresh"));
        request.session.claims.nonce = Some("stale".to_string());

        let token = strategy().generate_id_token(&request).unwrap();
        assert_eq!(payload(&token)["nonce"], "fresh");
    }

    #[test]
    fn test_custom_claims_cannot_shadow_registered() {
        let mut request = request(Some("real"));
        let extra = &mut request.session.claims.extra;
        extra.insert("nonce".to_string(), "fabricated".into());
        extra.insert("sub".to_string(), "mallory".into());
        extra.insert("email".to_string(), "peter@example.com".into());

        let token = strategy().generate_id_token(&request).unwrap();
        let segment = token.split('.').nth(1).unwrap();
        let raw = String::from_utf8(URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap();

        assert_eq!(raw.matches("\"nonce\"").count(), 1);
        assert_eq!(raw.matches("\"sub\"").count(), 1);
        assert!(!raw.contains("fabricated"));
        assert!(!raw.contains("mallory"));

        let claims = payload(&token);
        assert_eq!(claims["nonce"], "real");
        assert_eq!(claims["sub"], "peter");
        assert_eq!(claims["email"], "peter@example.com");
    }

    #[test]
    fn test_signing_key_failure_is_key_error() {
        let err = GenerationError::from(JwtError::Encoding {
            source: jsonwebtoken::errors::ErrorKind::InvalidEcdsaKey.into(),
        });
        assert!(err.is_key_error());
    }

    #[test]
    fn test_session_is_not_mutated() {
        let request = request(Some("abc"));
        strategy().generate_id_token(&request).unwrap();
        assert!(request.session.claims.nonce.is_none());
        assert_eq!(request.session.claims.iat, 0);
    }

    #[test]
    fn test_standard_claims_filled() {
        let strategy = strategy().with_lifetime(Duration::minutes(15));
        let token = strategy.generate_id_token(&request(None)).unwrap();
        let claims = payload(&token);

        let iat = claims["iat"].as_i64().unwrap();
        assert_eq!(claims["exp"].as_i64().unwrap(), iat + 900);
        assert_eq!(claims["iss"], ISSUER);
        assert_eq!(claims["aud"], "client-1");
        assert!(claims["auth_time"].as_i64().is_some());
    }

    #[test]
    fn test_session_claims_take_precedence() {
        let claims = IdTokenClaims::builder("peter")
            .issuer("https://other.example.com")
            .audience("client-2")
            .claim("email", "peter@example.com")
            .build();
        let request = AuthorizeRequest::new("client-1")
            .with_session(OpenIdSession::with_claims(claims, Headers::default()));

        let token = strategy().generate_id_token(&request).unwrap();
        let payload = payload(&token);
        assert_eq!(payload["iss"], "https://other.example.com");
        assert_eq!(payload["aud"], "client-2");
        assert_eq!(payload["email"], "peter@example.com");
    }

    #[test]
    fn test_header_overrides_merged() {
        let strategy = strategy();
        let mut request = request(None);
        request.session.headers = Headers::new().with_kid("rotated-key");

        let token = strategy.generate_id_token(&request).unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.kid.as_deref(), Some("rotated-key"));
        assert_eq!(header.alg, jsonwebtoken::Algorithm::ES384);
    }

    #[test]
    fn test_default_header_uses_signing_kid() {
        let strategy = strategy();
        let token = strategy.generate_id_token(&request(None)).unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.kid.as_deref(), Some(strategy.jwt_service().current_kid()));
    }

    #[test]
    fn test_empty_subject_rejected() {
        let request = AuthorizeRequest::new("client-1");
        let err = strategy().generate_id_token(&request).unwrap_err();
        assert!(matches!(err, GenerationError::MissingClaim { ref claim } if claim == "sub"));
    }

    #[test]
    fn test_missing_audience_rejected() {
        let request = AuthorizeRequest::new("").with_session(OpenIdSession::new("peter"));
        let err = strategy().generate_id_token(&request).unwrap_err();
        assert!(matches!(err, GenerationError::MissingClaim { ref claim } if claim == "aud"));
    }

    #[test]
    fn test_expiry_before_issue_rejected() {
        let now = OffsetDateTime::now_utc();
        let claims = IdTokenClaims::builder("peter")
            .issued_at(now)
            .expires_at(now - Duration::minutes(1))
            .build();
        let request = AuthorizeRequest::new("client-1")
            .with_session(OpenIdSession::with_claims(claims, Headers::default()));

        let err = strategy().generate_id_token(&request).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidClaims { .. }));
    }

    #[test]
    fn test_root_cause_of_other() {
        #[derive(Debug, PartialEq, thiserror::Error)]
        #[error("foo")]
        struct Foo;

        let err = GenerationError::other(Foo);
        assert_eq!(err.root_cause().downcast_ref::<Foo>(), Some(&Foo));
        assert_eq!(err.to_string(), "foo");
    }

    #[test]
    fn test_root_cause_of_plain_variant() {
        let err = GenerationError::missing_claim("sub");
        assert!(err.root_cause().downcast_ref::<GenerationError>().is_some());
        assert!(!err.is_key_error());
    }

    #[test]
    fn test_from_config_rejects_algorithm_mismatch() {
        let mut config = IssuanceConfig::default();
        config.signing.algorithm = "RS256".to_string();

        let err =
            DefaultIdTokenStrategy::from_config(&config, SigningKeyPair::generate_ec().unwrap())
                .unwrap_err();
        assert!(err.to_string().contains("ES384"));
    }

    #[test]
    fn test_from_config() {
        let mut config = IssuanceConfig::default();
        config.issuer = ISSUER.to_string();
        config.signing.algorithm = "ES384".to_string();
        config.id_token.lifetime = std::time::Duration::from_secs(300);

        let strategy =
            DefaultIdTokenStrategy::from_config(&config, SigningKeyPair::generate_ec().unwrap())
                .unwrap();
        let token = strategy.generate_id_token(&request(None)).unwrap();
        let claims = payload(&token);

        assert_eq!(claims["iss"], ISSUER);
        assert_eq!(
            claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap(),
            300
        );
    }
}
