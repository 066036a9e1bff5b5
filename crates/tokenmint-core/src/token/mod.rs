//! Token minting primitives.
//!
//! This module provides:
//!
//! - Secure random bytes for opaque bearer tokens
//! - HMAC-signed opaque tokens
//! - JWT signing, verification, and JWKS export

pub mod hmac;
pub mod jwt;
pub mod random;

pub use hmac::{HmacError, HmacStrategy};
pub use jwt::{Jwk, Jwks, JwtError, JwtService, SigningAlgorithm, SigningKeyPair};
pub use random::{EntropyError, random_bytes, random_token};
