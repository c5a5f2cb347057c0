//! The signed Object Storage and Identity client.
//!
//! One [`ObjectStorageClient`] serves both APIs. Every operation takes the
//! [`Environment`] whose credentials must sign it; credentials are resolved
//! per call and never stored as mutable state, so concurrent calls for
//! different environments cannot contaminate each other. Each call is a
//! single attempt: a 2xx response is success, anything else surfaces as an
//! error carrying the status and response body.
//!
//! The namespace is tenancy-wide. It is fetched once on first use and
//! cached for the lifetime of the client, or pre-seeded from configuration.

use http::{Method, StatusCode};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use stowage_auth::{
    CredentialRegistry, Environment, RequestContent, RequestSigner, SigningRequest,
};
use stowage_model::identity::CompartmentCollection;
use stowage_model::storage::{BucketSummary, CreateBucketDetails, ListObjects, ObjectSummary};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::error::StorageError;

/// Characters percent-encoded in object names and query values: everything
/// except unreserved characters and `/`, which object names keep literal.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Percent-encode an object name or query value, keeping `/` literal.
#[must_use]
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Whether `value` is already a compartment OCID rather than a name.
#[must_use]
pub fn is_compartment_ocid(value: &str) -> bool {
    value.starts_with("ocid1.compartment")
}

/// Authority part of an endpoint URL, as signed in the `host` header.
fn host_of(endpoint: &str) -> &str {
    endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .unwrap_or(endpoint)
        .trim_end_matches('/')
}

/// Signed client for the Object Storage and Identity APIs.
#[derive(Debug)]
pub struct ObjectStorageClient {
    http: reqwest::Client,
    config: StorageConfig,
    registry: CredentialRegistry,
    namespace: OnceCell<String>,
}

impl ObjectStorageClient {
    /// Create a client over `config` signing with `registry`.
    #[must_use]
    pub fn new(config: StorageConfig, registry: CredentialRegistry) -> Self {
        let namespace = OnceCell::new_with(config.namespace.clone());
        Self {
            http: reqwest::Client::new(),
            config,
            registry,
            namespace,
        }
    }

    /// The credential registry this client signs with.
    #[must_use]
    pub fn registry(&self) -> &CredentialRegistry {
        &self.registry
    }

    /// The addressing configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Compartment listed when a request names none: the configured default,
    /// or the tenancy root.
    #[must_use]
    pub fn fallback_compartment(&self) -> &str {
        self.config
            .default_compartment_ocid
            .as_deref()
            .unwrap_or_else(|| self.registry.tenancy_ocid())
    }

    /// The tenancy's Object Storage namespace, fetched on first use.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NamespaceUnavailable`] when the API answers
    /// with an empty namespace, besides the usual signing and transport
    /// failures.
    pub async fn namespace(&self, environment: Environment) -> Result<String, StorageError> {
        let namespace = self
            .namespace
            .get_or_try_init(|| self.fetch_namespace(environment))
            .await?;
        Ok(namespace.clone())
    }

    async fn fetch_namespace(&self, environment: Environment) -> Result<String, StorageError> {
        let response = self
            .send_signed(
                environment,
                Method::GET,
                &self.config.object_storage_endpoint,
                "/n/",
                None,
            )
            .await?;
        let response = expect_success(response).await?;

        let text = response.text().await?;
        let namespace = text.trim().trim_matches('"').to_owned();
        if namespace.is_empty() {
            return Err(StorageError::NamespaceUnavailable);
        }

        info!(namespace, "Resolved Object Storage namespace");
        Ok(namespace)
    }

    /// Resolve a compartment name to its OCID.
    ///
    /// The environment is classified from the name and its credentials sign
    /// the lookup; the classified environment is returned so the caller can
    /// keep signing follow-up calls with the same credentials.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::CompartmentNotFound`] when the tenancy has no
    /// compartment with that name, and propagates classification failures
    /// as [`StorageError::Auth`].
    pub async fn resolve_compartment(
        &self,
        name: &str,
    ) -> Result<(Environment, String), StorageError> {
        let environment = Environment::classify(name)?;

        let target = format!(
            "/20160918/compartments?compartmentId={}&compartmentIdInSubtree=true&name={}",
            self.registry.tenancy_ocid(),
            encode_component(name)
        );
        let response = self
            .send_signed(
                environment,
                Method::GET,
                &self.config.identity_endpoint,
                &target,
                None,
            )
            .await?;
        let response = expect_success(response).await?;

        let collection: CompartmentCollection = response.json().await?;
        let Some(compartment) = collection.into_items().into_iter().next() else {
            warn!(name, "Compartment not found in tenancy");
            return Err(StorageError::CompartmentNotFound(name.to_owned()));
        };

        debug!(name, ocid = %compartment.id, "Resolved compartment");
        Ok((environment, compartment.id))
    }

    /// Create `bucket` in the given compartment.
    ///
    /// Buckets are created private, standard tier, without versioning.
    pub async fn create_bucket(
        &self,
        environment: Environment,
        bucket: &str,
        compartment_ocid: &str,
    ) -> Result<(), StorageError> {
        let namespace = self.namespace(environment).await?;
        let details = CreateBucketDetails::new(bucket, compartment_ocid);
        let body = serde_json::to_vec(&details)?;

        let target = format!("/n/{namespace}/b/");
        let response = self
            .send_signed(
                environment,
                Method::POST,
                &self.config.object_storage_endpoint,
                &target,
                Some(("application/json", body)),
            )
            .await?;
        expect_success(response).await?;

        info!(bucket, compartment_ocid, "Created bucket");
        Ok(())
    }

    /// List the buckets of one compartment.
    pub async fn list_buckets(
        &self,
        environment: Environment,
        compartment_ocid: &str,
    ) -> Result<Vec<BucketSummary>, StorageError> {
        let namespace = self.namespace(environment).await?;
        let target = format!("/n/{namespace}/b/?compartmentId={compartment_ocid}");
        let response = self
            .send_signed(
                environment,
                Method::GET,
                &self.config.object_storage_endpoint,
                &target,
                None,
            )
            .await?;
        let response = expect_success(response).await?;
        Ok(response.json().await?)
    }

    /// Store `content` as `object_name` in `bucket`.
    pub async fn put_object(
        &self,
        environment: Environment,
        bucket: &str,
        object_name: &str,
        content_type: &str,
        content: Vec<u8>,
    ) -> Result<(), StorageError> {
        let namespace = self.namespace(environment).await?;
        let target = format!(
            "/n/{namespace}/b/{bucket}/o/{}",
            encode_component(object_name)
        );
        let response = self
            .send_signed(
                environment,
                Method::PUT,
                &self.config.object_storage_endpoint,
                &target,
                Some((content_type, content)),
            )
            .await?;
        expect_success(response).await?;

        info!(bucket, object = object_name, "Stored object");
        Ok(())
    }

    /// List the objects of `bucket`.
    pub async fn list_objects(
        &self,
        environment: Environment,
        bucket: &str,
    ) -> Result<Vec<ObjectSummary>, StorageError> {
        let namespace = self.namespace(environment).await?;
        let target = format!("/n/{namespace}/b/{bucket}/o");
        let response = self
            .send_signed(
                environment,
                Method::GET,
                &self.config.object_storage_endpoint,
                &target,
                None,
            )
            .await?;
        let response = expect_success(response).await?;

        let listing: ListObjects = response.json().await?;
        Ok(listing.objects)
    }

    /// Delete one object from `bucket`.
    pub async fn delete_object(
        &self,
        environment: Environment,
        bucket: &str,
        object_name: &str,
    ) -> Result<(), StorageError> {
        let namespace = self.namespace(environment).await?;
        let target = format!(
            "/n/{namespace}/b/{bucket}/o/{}",
            encode_component(object_name)
        );
        let response = self
            .send_signed(
                environment,
                Method::DELETE,
                &self.config.object_storage_endpoint,
                &target,
                None,
            )
            .await?;
        expect_success(response).await?;

        info!(bucket, object = object_name, "Deleted object");
        Ok(())
    }

    /// Delete `bucket`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::BucketNotEmpty`] when the API answers 409,
    /// which it does for buckets that still contain objects.
    pub async fn delete_bucket(
        &self,
        environment: Environment,
        bucket: &str,
    ) -> Result<(), StorageError> {
        let namespace = self.namespace(environment).await?;
        let target = format!("/n/{namespace}/b/{bucket}");
        let response = self
            .send_signed(
                environment,
                Method::DELETE,
                &self.config.object_storage_endpoint,
                &target,
                None,
            )
            .await?;

        if response.status() == StatusCode::CONFLICT {
            return Err(StorageError::BucketNotEmpty(bucket.to_owned()));
        }
        expect_success(response).await?;

        info!(bucket, "Deleted bucket");
        Ok(())
    }

    /// Sign and send one request. The signed `host` is derived from the
    /// endpoint so overridden endpoints keep signature and wire consistent.
    async fn send_signed(
        &self,
        environment: Environment,
        method: Method,
        endpoint: &str,
        request_target: &str,
        content: Option<(&str, Vec<u8>)>,
    ) -> Result<reqwest::Response, StorageError> {
        let endpoint = endpoint.trim_end_matches('/');
        let credentials = self.registry.credentials_for(environment)?;
        let signer = RequestSigner::new(self.registry.tenancy_ocid(), credentials)?;

        let signing_request = SigningRequest {
            method: method.clone(),
            request_target,
            host: host_of(endpoint),
            content: content.as_ref().map(|(content_type, body)| RequestContent {
                content_type,
                body: body.as_slice(),
            }),
        };
        let signed = signer.sign(&signing_request)?;

        let url = format!("{endpoint}{request_target}");
        debug!(%method, %url, %environment, "Sending signed request");

        let mut builder = self
            .http
            .request(method, url)
            .header("date", &signed.date)
            .header("authorization", &signed.authorization);

        if let Some((content_type, body)) = content {
            builder = builder.header("content-type", content_type);
            if let Some(digest) = &signed.content_sha256 {
                builder = builder.header("x-content-sha256", digest);
            }
            builder = builder.body(body);
        }

        Ok(builder.send().await?)
    }
}

/// Pass 2xx responses through, turn anything else into
/// [`StorageError::Api`] carrying the response body.
async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = response.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), detail, "API call failed");
    Err(StorageError::Api {
        status: status.as_u16(),
        detail,
    })
}
