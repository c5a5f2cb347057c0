//! Request and response bodies of the stowage HTTP API.
//!
//! Key spelling follows the shapes the frontend already consumes: mostly
//! snake_case, with `memberOf`/`displayName` kept as the directory API
//! spells them.

use serde::{Deserialize, Serialize};

use crate::storage::{BucketSummary, ObjectSummary};

/// Body of `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service name.
    pub name: String,
    /// Crate version.
    pub version: String,
    /// Always `true`.
    pub ok: bool,
    /// Path of the liveness route.
    pub health: String,
    /// Path of the route listing.
    pub routes: String,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Always `true`.
    pub ok: bool,
}

/// One entry of `GET /__routes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteInfo {
    /// Route path pattern.
    pub path: String,
    /// Methods the route answers.
    pub methods: Vec<String>,
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Address to issue a token for.
    #[serde(default)]
    pub email: Option<String>,
}

/// Response of `POST /login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent calls.
    pub access_token: String,
    /// Always `bearer`.
    pub token_type: String,
}

/// One membership entry of `GET /user/groups`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipEntry {
    /// Directory object id.
    pub id: String,
    /// Human-readable label.
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    /// Directory object kind.
    pub odata_type: Option<String>,
}

/// Body of `GET /user/groups`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserGroups {
    /// Address the token was issued for.
    pub email: String,
    /// Full membership, groups and roles alike.
    #[serde(rename = "memberOf")]
    pub member_of: Vec<MembershipEntry>,
}

/// Body of `GET /namespace`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceResponse {
    /// The tenancy's Object Storage namespace.
    pub namespace: String,
}

/// Response of `POST /buckets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketCreated {
    /// Always `true` on success.
    pub created: bool,
    /// Bucket name.
    pub bucket: String,
    /// Compartment the bucket was created in.
    pub compartment_ocid: String,
}

/// Response of `GET /buckets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketList {
    /// Buckets found.
    pub buckets: Vec<BucketSummary>,
    /// Set when the requested compartment could not be resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Response of `DELETE /buckets/{bucket}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketDeleted {
    /// Whether the bucket was deleted.
    pub deleted: bool,
    /// Bucket name.
    pub bucket: String,
}

/// Response of `GET /buckets/{bucket}/objects`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectList {
    /// Bucket name.
    pub bucket: String,
    /// Objects in the bucket.
    pub objects: Vec<ObjectSummary>,
}

/// Response of `DELETE /buckets/{bucket}/objects/{object}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDeleted {
    /// Whether the object was deleted.
    pub deleted: bool,
    /// Bucket name.
    pub bucket: String,
    /// Object name.
    pub object: String,
}

/// Response of `POST /buckets/{bucket}/upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    /// Whether the object was stored.
    pub uploaded: bool,
    /// Bucket name.
    pub bucket: String,
    /// Object name the content was stored under.
    pub object: String,
}

/// JSON upload body: base64 content plus the object name.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadJson {
    /// Base64-encoded object content.
    #[serde(default)]
    pub content_b64: Option<String>,
    /// Object name to store under.
    #[serde(default)]
    pub object_name: Option<String>,
}

/// Error body, `{"detail": …}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable description of the failure.
    pub detail: String,
}

impl ApiError {
    /// Create an error body.
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
