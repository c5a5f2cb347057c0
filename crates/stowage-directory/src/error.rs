//! Error types for the directory client.

/// Errors produced by token acquisition and directory lookups.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The token endpoint refused the client-credentials grant.
    #[error("Token request failed: {0}")]
    Token(String),

    /// The directory API answered with a non-success status.
    #[error("Directory API error ({status}): {detail}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        detail: String,
    },

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
