//! Storage client configuration.
//!
//! Provides [`StorageConfig`] for addressing the Object Storage and Identity
//! APIs. Values are loaded from environment variables; endpoints default to
//! the public hosts of the configured region and can be overridden, which
//! tests use to point the client at local fixtures.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Region used when `OCI_REGION` is not set.
pub const DEFAULT_REGION: &str = "sa-saopaulo-1";

/// Object Storage and Identity addressing configuration.
///
/// # Examples
///
/// ```
/// use stowage_client::StorageConfig;
///
/// let config = StorageConfig::default();
/// assert_eq!(config.region, "sa-saopaulo-1");
/// assert_eq!(
///     config.object_storage_endpoint,
///     "https://objectstorage.sa-saopaulo-1.oraclecloud.com"
/// );
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Region the endpoints belong to.
    #[builder(default = String::from(DEFAULT_REGION))]
    pub region: String,

    /// Pre-seeded Object Storage namespace; looked up on first use when
    /// absent.
    #[builder(default)]
    pub namespace: Option<String>,

    /// Compartment listed when a request names none. Falls back to the
    /// tenancy root when absent.
    #[builder(default)]
    pub default_compartment_ocid: Option<String>,

    /// Base URL of the Object Storage API.
    #[builder(default = object_storage_endpoint_for(DEFAULT_REGION))]
    pub object_storage_endpoint: String,

    /// Base URL of the Identity API.
    #[builder(default = identity_endpoint_for(DEFAULT_REGION))]
    pub identity_endpoint: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            region: String::from(DEFAULT_REGION),
            namespace: None,
            default_compartment_ocid: None,
            object_storage_endpoint: object_storage_endpoint_for(DEFAULT_REGION),
            identity_endpoint: identity_endpoint_for(DEFAULT_REGION),
        }
    }
}

impl StorageConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `OCI_REGION` | `sa-saopaulo-1` |
    /// | `OCI_NAMESPACE` | unset, fetched on first use |
    /// | `OCI_COMPARTMENT_OCID` | unset, tenancy root fallback |
    /// | `OCI_OBJECT_STORAGE_ENDPOINT` | `https://objectstorage.{region}.oraclecloud.com` |
    /// | `OCI_IDENTITY_ENDPOINT` | `https://identity.{region}.oraclecloud.com` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("OCI_REGION") {
            config.region = v;
            config.object_storage_endpoint = object_storage_endpoint_for(&config.region);
            config.identity_endpoint = identity_endpoint_for(&config.region);
        }
        if let Ok(v) = std::env::var("OCI_NAMESPACE") {
            config.namespace = Some(v);
        }
        if let Ok(v) = std::env::var("OCI_COMPARTMENT_OCID") {
            config.default_compartment_ocid = Some(v);
        }
        if let Ok(v) = std::env::var("OCI_OBJECT_STORAGE_ENDPOINT") {
            config.object_storage_endpoint = v;
        }
        if let Ok(v) = std::env::var("OCI_IDENTITY_ENDPOINT") {
            config.identity_endpoint = v;
        }

        config
    }
}

/// Public Object Storage endpoint of `region`.
#[must_use]
pub fn object_storage_endpoint_for(region: &str) -> String {
    format!("https://objectstorage.{region}.oraclecloud.com")
}

/// Public Identity endpoint of `region`.
#[must_use]
pub fn identity_endpoint_for(region: &str) -> String {
    format!("https://identity.{region}.oraclecloud.com")
}
