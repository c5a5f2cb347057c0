//! Directory client configuration.

use std::fmt;

use typed_builder::TypedBuilder;

/// Authority used when `DIRECTORY_AUTHORITY_ENDPOINT` is not set.
pub const DEFAULT_AUTHORITY_ENDPOINT: &str = "https://login.microsoftonline.com";

/// Graph endpoint used when `DIRECTORY_GRAPH_ENDPOINT` is not set.
pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";

/// Registration of this application in the identity directory.
///
/// Carries the client-credentials grant parameters plus the endpoints to
/// token and directory APIs, which tests override to point at local
/// fixtures.
#[derive(Clone, TypedBuilder)]
pub struct DirectoryConfig {
    /// Directory tenant the application is registered in.
    pub tenant_id: String,

    /// Application (client) id.
    pub client_id: String,

    /// Application secret. Never logged.
    pub client_secret: String,

    /// Base URL of the token authority.
    #[builder(default = String::from(DEFAULT_AUTHORITY_ENDPOINT))]
    pub authority_endpoint: String,

    /// Base URL of the directory API.
    #[builder(default = String::from(DEFAULT_GRAPH_ENDPOINT))]
    pub graph_endpoint: String,
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("authority_endpoint", &self.authority_endpoint)
            .field("graph_endpoint", &self.graph_endpoint)
            .finish()
    }
}

impl DirectoryConfig {
    /// Load configuration from environment variables, or `None` when the
    /// registration is absent and directory lookups stay disabled.
    ///
    /// Reads the following environment variables:
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `DIRECTORY_TENANT_ID` | required |
    /// | `DIRECTORY_CLIENT_ID` | required |
    /// | `DIRECTORY_CLIENT_SECRET` | required |
    /// | `DIRECTORY_AUTHORITY_ENDPOINT` | `https://login.microsoftonline.com` |
    /// | `DIRECTORY_GRAPH_ENDPOINT` | `https://graph.microsoft.com/v1.0` |
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let tenant_id = non_empty_var("DIRECTORY_TENANT_ID")?;
        let client_id = non_empty_var("DIRECTORY_CLIENT_ID")?;
        let client_secret = non_empty_var("DIRECTORY_CLIENT_SECRET")?;

        Some(Self {
            tenant_id,
            client_id,
            client_secret,
            authority_endpoint: non_empty_var("DIRECTORY_AUTHORITY_ENDPOINT")
                .unwrap_or_else(|| String::from(DEFAULT_AUTHORITY_ENDPOINT)),
            graph_endpoint: non_empty_var("DIRECTORY_GRAPH_ENDPOINT")
                .unwrap_or_else(|| String::from(DEFAULT_GRAPH_ENDPOINT)),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
