//! Object Storage wire types.
//!
//! Request and response bodies exchanged with the Object Storage API. The
//! API speaks camelCase JSON; the create-bucket payload is serialized
//! compactly and those exact bytes are what the request signature covers.

use serde::{Deserialize, Serialize};

/// Body of a create-bucket call.
///
/// Buckets are always created private, on the standard tier, without
/// versioning or object events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBucketDetails {
    /// Bucket name.
    pub name: String,
    /// Compartment the bucket is created in.
    pub compartment_id: String,
    /// Always `NoPublicAccess`.
    pub public_access_type: String,
    /// Always `Standard`.
    pub storage_tier: String,
    /// Always `Disabled`.
    pub versioning: String,
    /// Always `false`.
    pub object_events_enabled: bool,
}

impl CreateBucketDetails {
    /// Create the fixed-policy payload for `name` in `compartment_id`.
    #[must_use]
    pub fn new(name: impl Into<String>, compartment_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            compartment_id: compartment_id.into(),
            public_access_type: "NoPublicAccess".to_owned(),
            storage_tier: "Standard".to_owned(),
            versioning: "Disabled".to_owned(),
            object_events_enabled: false,
        }
    }
}

/// One bucket returned by a list-buckets call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    /// Bucket name.
    pub name: String,
    /// Namespace the bucket lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Compartment the bucket belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compartment_id: Option<String>,
    /// Principal that created the bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// RFC 3339 creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<String>,
    /// Entity tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// One object returned by a list-objects call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSummary {
    /// Object name, slashes preserved.
    pub name: String,
    /// Object size in bytes, present when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// RFC 3339 creation time, present when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<String>,
}

/// Response of a list-objects call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListObjects {
    /// Objects in the bucket, in lexical order.
    #[serde(default)]
    pub objects: Vec<ObjectSummary>,
    /// Continuation marker when the listing is truncated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_start_with: Option<String>,
}
