//! Signed client for the Object Storage and Identity APIs.
//!
//! This crate issues OCI REST calls signed with draft-cavage HTTP
//! signatures. Each operation takes the environment whose credentials must
//! sign it, so one client instance serves every registered environment
//! concurrently without shared mutable credential state.
//!
//! # Usage
//!
//! ```no_run
//! use stowage_auth::{CredentialRegistry, Environment};
//! use stowage_client::{ObjectStorageClient, StorageConfig};
//!
//! # async fn run() -> Result<(), stowage_client::StorageError> {
//! let registry = CredentialRegistry::from_env()?;
//! let client = ObjectStorageClient::new(StorageConfig::from_env(), registry);
//!
//! let namespace = client.namespace(Environment::Dev).await?;
//! let (environment, ocid) = client.resolve_compartment("cp-infra-ddw3-dev").await?;
//! client.create_bucket(environment, "reports", &ocid).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`client`]: the signed [`ObjectStorageClient`] and its operations
//! - [`config`]: [`StorageConfig`] and per-region endpoint derivation
//! - [`error`]: the [`StorageError`] taxonomy

pub mod client;
pub mod config;
pub mod error;

pub use client::{ObjectStorageClient, encode_component, is_compartment_ocid};
pub use config::{
    DEFAULT_REGION, StorageConfig, identity_endpoint_for, object_storage_endpoint_for,
};
pub use error::StorageError;
