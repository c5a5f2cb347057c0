//! Identity-directory (Graph) wire types.
//!
//! Token responses from the OAuth2 client-credentials endpoint and pages of
//! the `memberOf` listing, which uses `@odata.*` keys for its metadata.

use serde::{Deserialize, Serialize};

/// Prefix of the `@odata.type` value that marks a directory role.
pub const ODATA_ROLE_TYPE: &str = "#microsoft.graph.directoryRole";

/// Response of the client-credentials token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// The bearer token.
    pub access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Token type, `Bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
}

/// One group or role in a `memberOf` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryObject {
    /// Directory object id.
    pub id: String,
    /// Human-readable label.
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    /// `@odata.type` discriminator, e.g. `#microsoft.graph.group`.
    #[serde(rename = "@odata.type", default)]
    pub odata_type: Option<String>,
}

impl DirectoryObject {
    /// Whether this object is a directory role rather than a group.
    #[must_use]
    pub fn is_role(&self) -> bool {
        self.odata_type
            .as_deref()
            .is_some_and(|kind| kind.starts_with(ODATA_ROLE_TYPE))
    }
}

/// One page of a `memberOf` listing.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberOfPage {
    /// Objects on this page.
    #[serde(default)]
    pub value: Vec<DirectoryObject>,
    /// URL of the next page, absent on the last one.
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_deserialize_member_of_page_with_next_link() {
        let json = r##"{
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/users/u/memberOf?$skiptoken=abc",
            "value": [
                {"@odata.type": "#microsoft.graph.group", "id": "g1", "displayName": "OCI-Administrators-cp-infra-ddw3-dev"},
                {"@odata.type": "#microsoft.graph.directoryRole", "id": "r1", "displayName": "Global Reader"}
            ]
        }"##;
        let page: MemberOfPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.value.len(), 2);
        assert!(page.next_link.is_some());
        assert!(!page.value[0].is_role());
        assert!(page.value[1].is_role());
    }

    #[test]
    fn test_should_deserialize_last_page_without_next_link() {
        let json = r#"{"value": []}"#;
        let page: MemberOfPage = serde_json::from_str(json).unwrap();
        assert!(page.value.is_empty());
        assert!(page.next_link.is_none());
    }

    #[test]
    fn test_should_deserialize_token_response() {
        let json = r#"{"token_type":"Bearer","expires_in":3599,"access_token":"eyJ0eXAi"}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "eyJ0eXAi");
        assert_eq!(token.expires_in, Some(3599));
    }
}
