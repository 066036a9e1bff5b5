//! Token issuance error types.
//!
//! Each module owns its own error enum; [`TokenError`] gathers them for
//! callers that want a single type. Causes are carried through `source()`
//! rather than flattened into messages, so [`TokenError::root_cause`] can
//! hand back the failure that actually happened.

use std::error::Error as StdError;
use std::fmt;

use crate::config::ConfigError;
use crate::openid::strategy::GenerationError;
use crate::token::hmac::HmacError;
use crate::token::random::EntropyError;

/// Errors that can occur while minting tokens.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Identity token claim assembly or signing failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// The secure entropy source failed.
    #[error(transparent)]
    Entropy(#[from] EntropyError),

    /// An opaque token could not be minted or validated.
    #[error(transparent)]
    Hmac(#[from] HmacError),

    /// The issuance configuration is invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl TokenError {
    /// Returns the innermost error in the cause chain.
    #[must_use]
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        match self {
            Self::Generation(err) => err.root_cause(),
            Self::Entropy(err) => err.root_cause(),
            Self::Hmac(HmacError::Entropy(err)) => err.root_cause(),
            Self::Hmac(err) => err,
            Self::Configuration(err) => err,
        }
    }

    /// Returns `true` if the entropy source failed, directly or while minting
    /// an opaque token.
    #[must_use]
    pub fn is_entropy_error(&self) -> bool {
        matches!(self, Self::Entropy(_) | Self::Hmac(HmacError::Entropy(_)))
    }

    /// Returns `true` if this is a client error (bad token presented).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Hmac(HmacError::InvalidTokenFormat | HmacError::InvalidSignature)
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Generation(GenerationError::Signing(_)) => ErrorCategory::Signing,
            Self::Generation(_) => ErrorCategory::Claims,
            Self::Entropy(_) | Self::Hmac(HmacError::Entropy(_)) => ErrorCategory::Entropy,
            Self::Hmac(HmacError::SecretTooShort { .. }) => ErrorCategory::Configuration,
            Self::Hmac(_) => ErrorCategory::Token,
            Self::Configuration(_) => ErrorCategory::Configuration,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        if self.is_client_error() {
            "invalid_grant"
        } else {
            "server_error"
        }
    }
}

/// Categories of issuance errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Identity token claims were missing or inconsistent.
    Claims,
    /// Signing failed (usually a key problem).
    Signing,
    /// The operating system entropy source failed.
    Entropy,
    /// A presented opaque token was rejected.
    Token,
    /// Configuration errors.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Claims => write!(f, "claims"),
            Self::Signing => write!(f, "signing"),
            Self::Entropy => write!(f, "entropy"),
            Self::Token => write!(f, "token"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Walks `source()` down to the last error in the chain.
pub(crate) fn innermost<'a>(err: &'a (dyn StdError + 'static)) -> &'a (dyn StdError + 'static) {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current
}
