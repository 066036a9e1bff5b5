//! OpenID Connect identity token issuance.
//!
//! # Flow
//!
//! ```ignore
//! use tokenmint_core::openid::{DefaultIdTokenStrategy, IdTokenHandleHelper};
//!
//! let strategy = DefaultIdTokenStrategy::new(jwt_service);
//! let helper = IdTokenHandleHelper::new(Arc::new(strategy));
//!
//! // Token endpoint (code flow)
//! helper.issue_explicit(&request, &mut access_response)?;
//!
//! // Authorization endpoint (implicit flow)
//! helper.issue_implicit(&request, &mut authorize_response)?;
//! ```

pub mod hash;
pub mod helper;
pub mod session;
pub mod strategy;

pub use hash::token_hash;
pub use helper::{ID_TOKEN_FIELD, IdTokenHandleHelper, TokenPlacement};
pub use session::{
    Headers, IdTokenClaims, IdTokenClaimsBuilder, OpenIdSession, REGISTERED_CLAIMS,
    is_registered_claim,
};
pub use strategy::{
    DEFAULT_ID_TOKEN_LIFETIME, DefaultIdTokenStrategy, GenerationError, IdTokenStrategy,
    NONCE_PARAMETER,
};
