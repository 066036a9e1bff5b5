//! `at_hash` / `c_hash` computation (OpenID Connect Core 3.3.2.11).
//!
//! The hash is the left-most half of the SHA-2 digest of the ASCII token,
//! base64url-encoded without padding. The SHA-2 variant follows the ID
//! token's signing algorithm.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256, Sha384};

use crate::token::jwt::SigningAlgorithm;

/// Computes the `at_hash` / `c_hash` value for `token`.
///
/// # Examples
///
/// ```
/// use tokenmint_core::openid::hash::token_hash;
/// use tokenmint_core::token::jwt::SigningAlgorithm;
///
/// // RS256 halves a SHA-256 digest: 16 bytes, 22 base64url characters
/// assert_eq!(token_hash(SigningAlgorithm::RS256, "some-access-token").len(), 22);
/// ```
#[must_use]
pub fn token_hash(algorithm: SigningAlgorithm, token: &str) -> String {
    let digest = match algorithm {
        SigningAlgorithm::RS256 => Sha256::digest(token.as_bytes()).to_vec(),
        SigningAlgorithm::RS384 | SigningAlgorithm::ES384 => {
            Sha384::digest(token.as_bytes()).to_vec()
        }
    };
    URL_SAFE_NO_PAD.encode(&digest[..digest.len() / 2])
}
