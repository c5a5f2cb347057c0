//! Error types for credential resolution and request signing.
//!
//! Every failure mode stays distinguishable: callers map resolution errors,
//! key errors and signing errors to different HTTP statuses.

use std::path::PathBuf;

use crate::environment::Environment;

/// Errors that can occur while resolving credentials or signing a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The compartment name carries neither recognized environment suffix.
    #[error("Cannot resolve environment from compartment name: {0}")]
    UnresolvedEnvironment(String),

    /// No credentials are registered for the requested environment.
    #[error("No credentials registered for environment {0}")]
    UnknownEnvironment(Environment),

    /// The private key file does not exist or could not be read.
    #[error("Private key not found: {0}")]
    KeyNotFound(PathBuf),

    /// The key material is not a parseable RSA private key.
    #[error("Private key is not in a supported format")]
    InvalidKeyFormat,

    /// The RSA signing operation itself failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// A required environment variable is absent.
    #[error("Missing required environment variable: {0}")]
    MissingConfig(&'static str),
}
