//! Identity token issuance helper.
//!
//! Generates an ID token through the configured [`IdTokenStrategy`] and
//! attaches it to the response where the flow requires it:
//!
//! - **Explicit flow** (authorization code / hybrid, via the token
//!   endpoint): the token travels in the JSON response body.
//! - **Implicit flow**: there is no back-channel round trip, so the token
//!   rides in the redirect URI fragment. Never the query string, where it
//!   would leak through referrer headers and server logs.
//!
//! A call attaches the token at exactly one of those two places, or at
//! neither when generation fails. Each flow only accepts the response type
//! that can carry the token at its place, so a redirect can never receive
//! an identity token through its query string:
//!
//! ```compile_fail
//! use std::sync::Arc;
//! use tokenmint_core::oauth::{AuthorizeRequest, AuthorizeResponse};
//! use tokenmint_core::openid::{DefaultIdTokenStrategy, IdTokenHandleHelper};
//! use tokenmint_core::token::{JwtService, SigningKeyPair};
//!
//! let jwt = Arc::new(JwtService::new(
//!     SigningKeyPair::generate_ec().unwrap(),
//!     "https://auth.example.com",
//! ));
//! let helper = IdTokenHandleHelper::new(Arc::new(DefaultIdTokenStrategy::new(jwt)));
//! let mut redirect = AuthorizeResponse::new("https://app.example.com/cb").unwrap();
//!
//! // AuthorizeResponse is not an AccessResponder
//! helper
//!     .issue_explicit(&AuthorizeRequest::new("client-1"), &mut redirect)
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

use crate::oauth::request::Request;
use crate::oauth::response::{AccessResponder, AuthorizeResponder};
use crate::openid::strategy::{GenerationError, IdTokenStrategy};

/// Response field the identity token is attached under.
pub const ID_TOKEN_FIELD: &str = "id_token";

/// Where an issued identity token is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenPlacement {
    /// JSON response body (explicit flow).
    ResponseBody,
    /// Redirect URI fragment (implicit flow).
    Fragment,
}

impl TokenPlacement {
    /// Returns the placement name used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResponseBody => "response_body",
            Self::Fragment => "fragment",
        }
    }
}

impl fmt::Display for TokenPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Issues identity tokens onto protocol responses.
#[derive(Clone)]
pub struct IdTokenHandleHelper {
    strategy: Arc<dyn IdTokenStrategy>,
}

impl fmt::Debug for IdTokenHandleHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdTokenHandleHelper").finish_non_exhaustive()
    }
}

impl IdTokenHandleHelper {
    /// Creates a helper delegating to `strategy`.
    #[must_use]
    pub fn new(strategy: Arc<dyn IdTokenStrategy>) -> Self {
        Self { strategy }
    }

    /// Generates an identity token for `request`.
    ///
    /// The strategy's result is returned untouched.
    ///
    /// # Errors
    ///
    /// Returns the strategy's [`GenerationError`] as-is, so
    /// [`GenerationError::root_cause`] still yields the original failure.
    pub fn generate(&self, request: &dyn Request) -> Result<String, GenerationError> {
        self.strategy.generate_id_token(request)
    }

    /// Issues an identity token into the token endpoint response body.
    ///
    /// # Errors
    ///
    /// Returns the generation failure; `response` is left untouched.
    pub fn issue_explicit(
        &self,
        request: &dyn Request,
        response: &mut dyn AccessResponder,
    ) -> Result<(), GenerationError> {
        self.issue(request, TokenPlacement::ResponseBody, |token| {
            response.set_extra(ID_TOKEN_FIELD, token)
        })
    }

    /// Issues an identity token into the redirect URI fragment.
    ///
    /// # Errors
    ///
    /// Returns the generation failure; `response` is left untouched.
    pub fn issue_implicit(
        &self,
        request: &dyn Request,
        response: &mut dyn AuthorizeResponder,
    ) -> Result<(), GenerationError> {
        self.issue(request, TokenPlacement::Fragment, |token| {
            response.add_fragment(ID_TOKEN_FIELD, token)
        })
    }

    /// Generates an identity token and hands it to `attach` only on success.
    fn issue(
        &self,
        request: &dyn Request,
        placement: TokenPlacement,
        attach: impl FnOnce(&str),
    ) -> Result<(), GenerationError> {
        let token = match self.generate(request) {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(
                    client_id = %request.client_id(),
                    placement = %placement,
                    error = %err,
                    "ID token generation failed"
                );
                return Err(err);
            }
        };

        attach(&token);

        tracing::debug!(
            client_id = %request.client_id(),
            placement = %placement,
            "issued ID token"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::request::{AuthorizeRequest, Form};
    use crate::oauth::response::{AccessResponse, AuthorizeResponse};
    use crate::openid::session::OpenIdSession;
    use crate::openid::strategy::DefaultIdTokenStrategy;
    use crate::token::jwt::{JwtService, SigningAlgorithm, SigningKeyPair};
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    #[error("foo")]
    struct FooError;

    /// Response recording every attachment call, whichever flow it serves.
    #[derive(Default)]
    struct RecordingSink {
        extras: Vec<(String, String)>,
        fragments: Vec<(String, String)>,
    }

    impl AccessResponder for RecordingSink {
        fn set_extra(&mut self, key: &str, value: &str) {
            self.extras.push((key.to_string(), value.to_string()));
        }
    }

    impl AuthorizeResponder for RecordingSink {
        fn add_fragment(&mut self, key: &str, value: &str) {
            self.fragments.push((key.to_string(), value.to_string()));
        }
    }

    /// Strategy returning queued results and recording the requests it saw.
    struct MockStrategy {
        results: Mutex<Vec<Result<String, GenerationError>>>,
        calls: Mutex<Vec<(String, Option<String>)>>,
    }

    impl MockStrategy {
        fn new(results: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                results: Mutex::new(results),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, Option<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl IdTokenStrategy for MockStrategy {
        fn generate_id_token(&self, request: &dyn Request) -> Result<String, GenerationError> {
            self.calls.lock().unwrap().push((
                request.session().subject().to_string(),
                request.form_value("nonce").map(str::to_string),
            ));
            self.results.lock().unwrap().remove(0)
        }
    }

    fn request(nonce: &str) -> AuthorizeRequest {
        AuthorizeRequest::new("client-1")
            .with_form(Form::from_iter([("nonce", nonce)]))
            .with_session(OpenIdSession::new("peter"))
    }

    fn rsa_helper() -> IdTokenHandleHelper {
        let key_pair = SigningKeyPair::generate_rsa(SigningAlgorithm::RS256).unwrap();
        let jwt = Arc::new(JwtService::new(key_pair, "https://auth.example.com"));
        IdTokenHandleHelper::new(Arc::new(DefaultIdTokenStrategy::new(jwt)))
    }

    fn payload(token: &str) -> serde_json::Value {
        let segment = token.split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn test_generate_id_token() {
        let strategy = Arc::new(MockStrategy::new(vec![
            Err(GenerationError::other(FooError)),
            Ok("asdf".to_string()),
        ]));
        let helper = IdTokenHandleHelper::new(strategy.clone());
        let request = request("11111111111111111111111111111111111");

        // should fail because generator failed
        let err = helper.generate(&request).unwrap_err();
        assert_eq!(err.root_cause().downcast_ref::<FooError>(), Some(&FooError));

        // should pass
        let token = helper.generate(&request).unwrap();
        assert_eq!(token, "asdf");

        let calls = strategy.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "peter");
        assert_eq!(
            calls[0].1.as_deref(),
            Some("11111111111111111111111111111111111")
        );
    }

    #[test]
    fn test_generate_preserves_signing_cause() {
        let strategy = MockStrategy::new(vec![Err(GenerationError::from(
            crate::token::jwt::JwtError::invalid_key("revoked"),
        ))]);
        let helper = IdTokenHandleHelper::new(Arc::new(strategy));

        let err = helper.generate(&request("n")).unwrap_err();
        assert!(err.is_key_error());
        assert!(matches!(
            err.root_cause()
                .downcast_ref::<crate::token::jwt::JwtError>(),
            Some(crate::token::jwt::JwtError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_issue_explicit_id_token() {
        let helper = rsa_helper();
        let mut sink = RecordingSink::default();

        helper
            .issue_explicit(&request("111111111111"), &mut sink)
            .unwrap();

        assert_eq!(sink.extras.len(), 1);
        assert!(sink.fragments.is_empty());
        let (key, token) = &sink.extras[0];
        assert_eq!(key, "id_token");
        assert!(!token.is_empty());
        assert_eq!(payload(token)["nonce"], "111111111111");
    }

    #[test]
    fn test_issue_implicit_id_token() {
        let helper = rsa_helper();
        let mut sink = RecordingSink::default();

        helper
            .issue_implicit(&request("111111111111"), &mut sink)
            .unwrap();

        assert_eq!(sink.fragments.len(), 1);
        assert!(sink.extras.is_empty());
        let (key, token) = &sink.fragments[0];
        assert_eq!(key, "id_token");
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(payload(token)["sub"], "peter");
    }

    #[test]
    fn test_failed_issuance_leaves_sink_untouched() {
        for placement in [TokenPlacement::ResponseBody, TokenPlacement::Fragment] {
            let strategy = MockStrategy::new(vec![Err(GenerationError::other(FooError))]);
            let helper = IdTokenHandleHelper::new(Arc::new(strategy));
            let mut sink = RecordingSink::default();

            let request = request("111111111111");
            let err = match placement {
                TokenPlacement::ResponseBody => helper.issue_explicit(&request, &mut sink),
                TokenPlacement::Fragment => helper.issue_implicit(&request, &mut sink),
            }
            .unwrap_err();

            assert_eq!(err.root_cause().downcast_ref::<FooError>(), Some(&FooError));
            assert!(sink.extras.is_empty(), "{} touched set_extra", placement);
            assert!(sink.fragments.is_empty(), "{} touched add_fragment", placement);
        }
    }

    #[test]
    fn test_strategy_claim_failure_propagates() {
        let helper = rsa_helper();
        let request = AuthorizeRequest::new("client-1");
        let mut sink = RecordingSink::default();

        let err = helper.issue_explicit(&request, &mut sink).unwrap_err();
        assert!(matches!(err, GenerationError::MissingClaim { .. }));
        assert!(sink.extras.is_empty());
    }

    #[test]
    fn test_explicit_into_access_response() {
        let strategy = MockStrategy::new(vec![Ok("a.b.c".to_string())]);
        let helper = IdTokenHandleHelper::new(Arc::new(strategy));
        let mut response = AccessResponse::bearer("at-123");

        helper
            .issue_explicit(&request("111111111111"), &mut response)
            .unwrap();

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["id_token"], "a.b.c");
    }

    #[test]
    fn test_implicit_into_authorize_redirect() {
        let strategy = MockStrategy::new(vec![Ok("a.b.c".to_string())]);
        let helper = IdTokenHandleHelper::new(Arc::new(strategy));
        let mut response = AuthorizeResponse::new("https://app.example.com/callback").unwrap();

        helper
            .issue_implicit(&request("111111111111"), &mut response)
            .unwrap();

        let url = url::Url::parse(&response.redirect_url()).unwrap();
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), Some("id_token=a.b.c"));
    }

    #[test]
    fn test_implicit_keeps_existing_query_clean() {
        let helper = rsa_helper();
        let mut response =
            AuthorizeResponse::new("https://app.example.com/callback?tenant=1").unwrap();
        response.add_query("state", "xyz");

        helper
            .issue_implicit(&request("111111111111"), &mut response)
            .unwrap();

        let url = url::Url::parse(&response.redirect_url()).unwrap();
        assert_eq!(url.query(), Some("tenant=1&state=xyz"));
        assert!(url.query_pairs().all(|(key, _)| key != "id_token"));
        assert!(response.fragment("id_token").is_some());
        assert_eq!(response.query("id_token"), None);
    }

    #[test]
    fn test_concurrent_issuance() {
        let helper = rsa_helper();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let helper = helper.clone();
                std::thread::spawn(move || {
                    let mut sink = RecordingSink::default();
                    let nonce = format!("nonce-{}", i);
                    helper.issue_implicit(&request(&nonce), &mut sink).unwrap();
                    (nonce, sink.fragments.remove(0).1)
                })
            })
            .collect();

        for handle in handles {
            let (nonce, token) = handle.join().unwrap();
            assert_eq!(payload(&token)["nonce"], nonce.as_str());
        }
    }

    #[test]
    fn test_token_placement_display() {
        assert_eq!(TokenPlacement::ResponseBody.to_string(), "response_body");
        assert_eq!(TokenPlacement::Fragment.as_str(), "fragment");
    }
}
