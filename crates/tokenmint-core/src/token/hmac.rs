//! HMAC-signed opaque tokens.
//!
//! An opaque token is `base64url(key) + "." + base64url(signature)` where
//! `key` comes from [`random_bytes`] and `signature` is HMAC-SHA256 of the
//! key under a server-wide secret. The signature segment is what storage
//! layers index on; the key segment never needs to be persisted.
//!
//! ```ignore
//! let strategy = HmacStrategy::new(secret, 32)?;
//! let (token, signature) = strategy.generate()?;
//! strategy.validate(&token)?;
//! ```

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::random::{EntropyError, random_bytes};
use crate::config::OpaqueTokenConfig;

type HmacSha256 = Hmac<Sha256>;

/// Shortest HMAC secret accepted, in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Default number of random key bytes per token.
pub const DEFAULT_ENTROPY: usize = 32;

/// Errors produced by [`HmacStrategy`].
#[derive(Debug, thiserror::Error)]
pub enum HmacError {
    /// The signing secret is shorter than [`MIN_SECRET_LENGTH`].
    #[error("HMAC secret must be at least {MIN_SECRET_LENGTH} bytes, got {actual}")]
    SecretTooShort {
        /// Length of the rejected secret.
        actual: usize,
    },

    /// The token is not two base64url segments joined by a dot.
    #[error("Token has an invalid format")]
    InvalidTokenFormat,

    /// The signature does not match the key.
    #[error("Token signature is invalid")]
    InvalidSignature,

    /// The entropy source failed while minting a key.
    #[error(transparent)]
    Entropy(#[from] EntropyError),
}

/// Mints and validates HMAC-signed opaque tokens.
#[derive(Clone)]
pub struct HmacStrategy {
    secret: Vec<u8>,
    entropy: usize,
}

impl fmt::Debug for HmacStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacStrategy")
            .field("entropy", &self.entropy)
            .finish_non_exhaustive()
    }
}

impl HmacStrategy {
    /// Creates a strategy signing with `secret` and `entropy` random bytes per key.
    ///
    /// An `entropy` of zero falls back to [`DEFAULT_ENTROPY`].
    ///
    /// # Errors
    ///
    /// Returns [`HmacError::SecretTooShort`] for secrets under
    /// [`MIN_SECRET_LENGTH`] bytes.
    pub fn new(secret: Vec<u8>, entropy: usize) -> Result<Self, HmacError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(HmacError::SecretTooShort {
                actual: secret.len(),
            });
        }

        Ok(Self {
            secret,
            entropy: if entropy == 0 { DEFAULT_ENTROPY } else { entropy },
        })
    }

    /// Creates a strategy using the configured entropy.
    ///
    /// # Errors
    ///
    /// See [`HmacStrategy::new`].
    pub fn from_config(config: &OpaqueTokenConfig, secret: Vec<u8>) -> Result<Self, HmacError> {
        Self::new(secret, config.entropy_bytes)
    }

    /// Number of random key bytes per token.
    #[must_use]
    pub fn entropy(&self) -> usize {
        self.entropy
    }

    /// Generates a new token and returns it together with its signature segment.
    ///
    /// # Errors
    ///
    /// Returns [`HmacError::Entropy`] if the entropy source fails.
    pub fn generate(&self) -> Result<(String, String), HmacError> {
        let key = random_bytes(self.entropy)?;
        let signature = URL_SAFE_NO_PAD.encode(self.mac(&key).finalize().into_bytes());
        let token = format!("{}.{}", URL_SAFE_NO_PAD.encode(&key), signature);
        Ok((token, signature))
    }

    /// Checks that `token` was minted with this strategy's secret.
    ///
    /// # Errors
    ///
    /// Returns [`HmacError::InvalidTokenFormat`] for malformed tokens and
    /// [`HmacError::InvalidSignature`] when the signature does not verify.
    pub fn validate(&self, token: &str) -> Result<(), HmacError> {
        let (key, signature) = token
            .split_once('.')
            .ok_or(HmacError::InvalidTokenFormat)?;
        if key.is_empty() || signature.is_empty() {
            return Err(HmacError::InvalidTokenFormat);
        }

        let key = URL_SAFE_NO_PAD
            .decode(key)
            .map_err(|_| HmacError::InvalidTokenFormat)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| HmacError::InvalidTokenFormat)?;

        self.mac(&key)
            .verify_slice(&signature)
            .map_err(|_| HmacError::InvalidSignature)
    }

    /// Returns the signature segment of a token, if it has one.
    #[must_use]
    pub fn signature(token: &str) -> Option<&str> {
        token
            .split_once('.')
            .map(|(_, signature)| signature)
            .filter(|signature| !signature.is_empty())
    }

    fn mac(&self, key: &[u8]) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(key);
        mac
    }
}
