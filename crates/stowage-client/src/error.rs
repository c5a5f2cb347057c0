//! Error types for the storage client.

use stowage_auth::AuthError;

/// Errors produced by Object Storage and Identity calls.
///
/// Every call is a single attempt; there is no retry. Credential and
/// signing failures stay distinguishable from transport and API failures
/// so callers can map them to different HTTP statuses.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Credential resolution or signing failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The namespace could not be determined.
    #[error("Namespace could not be determined")]
    NamespaceUnavailable,

    /// No compartment with the given name exists in the tenancy.
    #[error("Compartment not found: {0}")]
    CompartmentNotFound(String),

    /// The bucket still contains objects and cannot be deleted.
    #[error("Bucket is not empty: {0}")]
    BucketNotEmpty(String),

    /// The API answered with a non-success status.
    #[error("API error ({status}): {detail}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        detail: String,
    },

    /// A request or response body could not be serialized or parsed.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
