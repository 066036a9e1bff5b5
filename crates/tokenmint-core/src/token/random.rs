//! Secure opaque token entropy.
//!
//! Every bearer value the framework hands out (access tokens, refresh
//! tokens, authorization codes) starts as bytes from [`random_bytes`].
//!
//! # Security
//!
//! - Bytes come straight from the operating system's entropy interface
//!   ([`OsRng`]); there is no seeded or user-space generator in between.
//! - A failing entropy source is reported once and never retried.
//! - Random bytes are never logged.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;

/// Errors raised by the secure entropy source.
#[derive(Debug, thiserror::Error)]
pub enum EntropyError {
    /// The operating system entropy source failed.
    #[error("Secure entropy source unavailable while reading {requested} bytes")]
    Unavailable {
        /// Number of bytes that were requested.
        requested: usize,
        /// The failure reported by the platform.
        #[source]
        source: rand::Error,
    },
}

impl EntropyError {
    /// Returns the platform failure behind this error.
    ///
    /// `rand::Error` hides the platform error behind `inner()` rather than
    /// `source()`, so the chain is unwrapped here explicitly.
    #[must_use]
    pub fn root_cause(&self) -> &(dyn std::error::Error + 'static) {
        match self {
            Self::Unavailable { source, .. } => crate::error::innermost(source.inner()),
        }
    }
}

/// Returns `n` bytes read from the operating system's secure entropy source.
///
/// A zero-length request returns an empty vector without touching the
/// entropy source.
///
/// # Errors
///
/// Returns [`EntropyError::Unavailable`] if the platform fails to supply
/// entropy. The call is not retried.
///
/// # Examples
///
/// ```
/// use tokenmint_core::token::random::random_bytes;
///
/// let bytes = random_bytes(128).unwrap();
/// assert_eq!(bytes.len(), 128);
/// ```
pub fn random_bytes(n: usize) -> Result<Vec<u8>, EntropyError> {
    let mut bytes = vec![0u8; n];
    if n == 0 {
        return Ok(bytes);
    }

    if let Err(source) = OsRng.try_fill_bytes(&mut bytes) {
        tracing::error!(requested = n, error = %source, "secure entropy source failed");
        return Err(EntropyError::Unavailable {
            requested: n,
            source,
        });
    }

    Ok(bytes)
}

/// Returns `n` random bytes encoded as base64url without padding.
///
/// This is the string form bearer tokens take on the wire. 32 bytes
/// encode to 43 characters.
///
/// # Errors
///
/// Propagates [`EntropyError`] from [`random_bytes`].
pub fn random_token(n: usize) -> Result<String, EntropyError> {
    random_bytes(n).map(|bytes| URL_SAFE_NO_PAD.encode(bytes))
}
