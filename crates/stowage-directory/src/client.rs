//! Bearer-token client for the identity directory.
//!
//! A completely separate authentication path from the storage signing core:
//! tokens come from a client-credentials grant and ride along as plain
//! `Bearer` headers. The token is cached and reused until shortly before it
//! expires.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use stowage_model::directory::{DirectoryObject, MemberOfPage, TokenResponse};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::DirectoryConfig;
use crate::error::DirectoryError;

/// Scope requested for the client-credentials grant.
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// A cached token must remain valid at least this long to be reused.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Client for the directory's token and membership APIs.
pub struct DirectoryClient {
    http: reqwest::Client,
    config: DirectoryConfig,
    token: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for DirectoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DirectoryClient {
    /// Create a client for the registration in `config`.
    #[must_use]
    pub fn new(config: DirectoryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            token: Mutex::new(None),
        }
    }

    /// Bearer token for the directory API, fetched on first use and cached
    /// until shortly before expiry.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Token`] when the token endpoint refuses
    /// the grant.
    pub async fn access_token(&self) -> Result<String, DirectoryError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<CachedToken, DirectoryError> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.authority_endpoint.trim_end_matches('/'),
            self.config.tenant_id
        );
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", GRAPH_SCOPE),
        ];

        let response = self.http.post(&url).form(&form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Token request refused");
            return Err(DirectoryError::Token(detail));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = i64::try_from(token.expires_in.unwrap_or(3600)).unwrap_or(3600);
        debug!(lifetime, "Acquired directory token");
        Ok(CachedToken {
            value: token.access_token,
            expires_at: Utc::now() + Duration::seconds(lifetime),
        })
    }

    /// Every directory object `user` is a member of, groups and roles
    /// alike, following `@odata.nextLink` pages to exhaustion.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Api`] when the directory answers with a
    /// non-success status on any page.
    pub async fn member_of(&self, user: &str) -> Result<Vec<DirectoryObject>, DirectoryError> {
        let token = self.access_token().await?;
        let mut url = format!(
            "{}/users/{}/memberOf?$select=id,displayName",
            self.config.graph_endpoint.trim_end_matches('/'),
            user
        );

        let mut items = Vec::new();
        loop {
            let response = self.http.get(&url).bearer_auth(&token).send().await?;
            let status = response.status();
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), user, "Membership lookup failed");
                return Err(DirectoryError::Api {
                    status: status.as_u16(),
                    detail,
                });
            }

            let page: MemberOfPage = response.json().await?;
            items.extend(page.value);
            match page.next_link {
                Some(next) => url = next,
                None => break,
            }
        }

        debug!(user, count = items.len(), "Resolved directory membership");
        Ok(items)
    }
}

/// Split membership into `(groups, roles)` by OData type.
#[must_use]
pub fn split_membership(
    items: Vec<DirectoryObject>,
) -> (Vec<DirectoryObject>, Vec<DirectoryObject>) {
    items.into_iter().partition(|item| !item.is_role())
}
