//! Private key loading.
//!
//! API keys arrive either inline through the environment or as a PEM file on
//! disk. [`KeySource::from_env_or_path`] picks the source with the documented
//! precedence; [`KeySource::load`] turns it into an [`RsaPrivateKey`]. Key
//! material is never logged and the `Debug` output redacts inline keys.

use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;

use crate::error::AuthError;

/// Where the private half of an API key comes from.
#[derive(Clone)]
pub enum KeySource {
    /// Base64-encoded PEM document supplied inline.
    Base64(String),
    /// PEM document supplied inline. Literal `\n` escape sequences are
    /// normalized to real newlines before parsing.
    Pem(String),
    /// Path to a PEM file on disk.
    Path(PathBuf),
}

impl KeySource {
    /// Select the key source for a configured key path, honoring the inline
    /// overrides: `OCI_PRIVATE_KEY_B64` wins over `OCI_PRIVATE_KEY_PEM`,
    /// which wins over the file path. Empty variables count as absent.
    #[must_use]
    pub fn from_env_or_path(path: impl Into<PathBuf>) -> Self {
        if let Some(encoded) = non_empty_var("OCI_PRIVATE_KEY_B64") {
            return Self::Base64(encoded);
        }
        if let Some(pem) = non_empty_var("OCI_PRIVATE_KEY_PEM") {
            return Self::Pem(pem);
        }
        Self::Path(path.into())
    }

    /// Load and parse the RSA private key from this source.
    ///
    /// Both PKCS#8 (`BEGIN PRIVATE KEY`) and PKCS#1 (`BEGIN RSA PRIVATE
    /// KEY`) documents are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyNotFound`] when a file source does not exist
    /// or cannot be read, and [`AuthError::InvalidKeyFormat`] when the bytes
    /// do not decode or do not parse as an RSA private key.
    pub fn load(&self) -> Result<RsaPrivateKey, AuthError> {
        let pem = self.pem_document()?;
        parse_private_key(&pem)
    }

    fn pem_document(&self) -> Result<String, AuthError> {
        match self {
            Self::Base64(encoded) => {
                let bytes = STANDARD
                    .decode(encoded.trim())
                    .map_err(|_| AuthError::InvalidKeyFormat)?;
                String::from_utf8(bytes).map_err(|_| AuthError::InvalidKeyFormat)
            }
            Self::Pem(pem) => Ok(pem.replace("\\n", "\n")),
            Self::Path(path) => {
                if !path.exists() {
                    return Err(AuthError::KeyNotFound(path.clone()));
                }
                fs::read_to_string(path).map_err(|_| AuthError::KeyNotFound(path.clone()))
            }
        }
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base64(_) => f.debug_tuple("Base64").field(&"[REDACTED]").finish(),
            Self::Pem(_) => f.debug_tuple("Pem").field(&"[REDACTED]").finish(),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

/// Parse a PEM document as PKCS#8 first, then PKCS#1.
fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, AuthError> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|_| AuthError::InvalidKeyFormat)
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
