//! Issuance configuration.
//!
//! This module provides the configuration types for the issuance core:
//! the issuer identity, ID token lifetime, signing algorithm, and opaque
//! token entropy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::token::jwt::SigningAlgorithm;

/// Smallest accepted opaque token entropy, in bytes (128 bits).
pub const MIN_ENTROPY_BYTES: usize = 16;

/// Root issuance configuration.
///
/// # Example (TOML)
///
/// ```toml
/// issuer = "https://auth.example.com"
///
/// [id_token]
/// lifetime = "1h"
///
/// [signing]
/// algorithm = "RS256"
///
/// [opaque_token]
/// entropy_bytes = 32
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IssuanceConfig {
    /// Server issuer URL (used in the token `iss` claim).
    pub issuer: String,

    /// ID token configuration.
    pub id_token: IdTokenConfig,

    /// Token signing configuration.
    pub signing: SigningConfig,

    /// Opaque bearer token configuration.
    pub opaque_token: OpaqueTokenConfig,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            id_token: IdTokenConfig::default(),
            signing: SigningConfig::default(),
            opaque_token: OpaqueTokenConfig::default(),
        }
    }
}

/// ID token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdTokenConfig {
    /// Lifetime applied when the session does not set `exp`.
    #[serde(with = "humantime_serde")]
    pub lifetime: Duration,
}

impl Default for IdTokenConfig {
    fn default() -> Self {
        Self {
            lifetime: Duration::from_secs(3600), // 1 hour
        }
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Signing algorithm.
    /// Supported: "RS256", "RS384", "ES384"
    pub algorithm: String,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: "RS256".to_string(),
        }
    }
}

impl SigningConfig {
    /// Parses the configured algorithm.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unsupported algorithms.
    pub fn signing_algorithm(&self) -> Result<SigningAlgorithm, ConfigError> {
        SigningAlgorithm::parse(&self.algorithm).ok_or_else(|| {
            ConfigError::InvalidValue(format!(
                "Invalid signing algorithm: '{}'. Must be RS256, RS384, or ES384",
                self.algorithm
            ))
        })
    }
}

/// Opaque bearer token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OpaqueTokenConfig {
    /// Random bytes per access token, refresh token, or authorization code.
    pub entropy_bytes: usize,
}

impl Default for OpaqueTokenConfig {
    fn default() -> Self {
        Self { entropy_bytes: 32 }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl IssuanceConfig {
    /// Parses and validates a TOML configuration document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and any error
    /// [`IssuanceConfig::validate`] reports.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(input).map_err(|e| ConfigError::Parse(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the issuer URL is empty, and
    /// `ConfigError::InvalidValue` if:
    /// - The signing algorithm is not supported
    /// - The ID token lifetime is zero
    /// - Opaque token entropy is below [`MIN_ENTROPY_BYTES`]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::Missing("issuer".to_string()));
        }

        self.signing.signing_algorithm()?;

        if self.id_token.lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "id_token.lifetime must be > 0".to_string(),
            ));
        }

        if self.opaque_token.entropy_bytes < MIN_ENTROPY_BYTES {
            return Err(ConfigError::InvalidValue(format!(
                "opaque_token.entropy_bytes must be at least {}",
                MIN_ENTROPY_BYTES
            )));
        }

        Ok(())
    }
}
