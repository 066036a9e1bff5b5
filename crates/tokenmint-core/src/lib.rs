//! # tokenmint-core
//!
//! Token issuance core for an OAuth 2.0 / OpenID Connect authorization server.
//!
//! This crate provides:
//! - Signed identity token generation with nonce binding
//! - Identity token placement for the explicit and implicit flows
//! - Secure opaque token material from the operating system entropy source
//! - HMAC-signed opaque bearer tokens
//!
//! ## Modules
//!
//! - [`config`] - Issuance configuration
//! - [`error`] - Aggregated error type and categories
//! - [`oauth`] - Request and response abstractions
//! - [`openid`] - Identity token claims, strategy, and issuance helper
//! - [`token`] - Random bytes, HMAC opaque tokens, and JWT signing

pub mod config;
pub mod error;
pub mod oauth;
pub mod openid;
pub mod token;

pub use config::{ConfigError, IssuanceConfig};
pub use error::{ErrorCategory, TokenError};
pub use oauth::{
    AccessResponder, AccessResponse, AuthorizeRequest, AuthorizeResponder, AuthorizeResponse, Form,
    Request,
};
pub use openid::{
    DefaultIdTokenStrategy, GenerationError, Headers, IdTokenClaims, IdTokenHandleHelper,
    IdTokenStrategy, OpenIdSession, TokenPlacement,
};
pub use token::{
    EntropyError, HmacError, HmacStrategy, JwtError, JwtService, SigningAlgorithm,
    SigningKeyPair, random_bytes, random_token,
};

/// Type alias for issuance results.
pub type TokenResult<T> = Result<T, TokenError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tokenmint_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::TokenResult;
    pub use crate::config::{ConfigError, IssuanceConfig};
    pub use crate::error::{ErrorCategory, TokenError};
    pub use crate::oauth::{
        AccessResponder, AccessResponse, AuthorizeRequest, AuthorizeResponder, AuthorizeResponse,
        Form, Request,
    };
    pub use crate::openid::{
        DefaultIdTokenStrategy, GenerationError, Headers, IdTokenClaims, IdTokenHandleHelper,
        IdTokenStrategy, OpenIdSession, TokenPlacement, token_hash,
    };
    pub use crate::token::{
        EntropyError, HmacError, HmacStrategy, JwtError, JwtService, SigningAlgorithm,
        SigningKeyPair, random_bytes, random_token,
    };
}
