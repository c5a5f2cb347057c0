//! Client for the identity directory's token and membership APIs.
//!
//! Acquires application tokens through the client-credentials grant and
//! resolves which groups and roles a user belongs to. This path never
//! touches the storage request-signing core; tokens ride along as plain
//! `Bearer` headers.
//!
//! # Modules
//!
//! - [`client`]: [`DirectoryClient`] with token caching and paginated
//!   membership lookups
//! - [`config`]: [`DirectoryConfig`] loaded from the environment
//! - [`error`]: the [`DirectoryError`] taxonomy

pub mod client;
pub mod config;
pub mod error;

pub use client::{DirectoryClient, split_membership};
pub use config::{DEFAULT_AUTHORITY_ENDPOINT, DEFAULT_GRAPH_ENDPOINT, DirectoryConfig};
pub use error::DirectoryError;
