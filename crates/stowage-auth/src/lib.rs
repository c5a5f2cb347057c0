//! OCI API-key request signing and credential environment selection.
//!
//! This crate implements the client side of the draft-cavage HTTP signature
//! scheme the Oracle Cloud Object Storage and Identity APIs authenticate
//! with: a signing string built from an ordered header list, an RSA PKCS#1
//! v1.5 signature over SHA-256, and an `Authorization: Signature …` header
//! carrying the key id `tenancy/user/fingerprint`.
//!
//! # Overview
//!
//! Buckets live in compartments whose names end in an environment suffix,
//! and each environment signs with its own API user. The flow is:
//!
//! 1. [`Environment::classify`] the compartment name (`-dev` / `-prd`).
//! 2. Look the environment up in an immutable [`CredentialRegistry`].
//! 3. Build a [`RequestSigner`] for the resolved [`CredentialSet`] and sign
//!    each request with it.
//!
//! Credentials travel by value from resolution to signing; there is no
//! process-wide "active" credential, so concurrent requests for different
//! environments cannot interfere.
//!
//! # Usage
//!
//! ```rust
//! use stowage_auth::{Environment, digest_body};
//!
//! let environment = Environment::classify("cp-infra-ddw3-dev").unwrap();
//! assert_eq!(environment, Environment::Dev);
//!
//! // SHA-256 digest of the empty body, as signed for bodyless requests
//! assert_eq!(digest_body(b""), "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
//! ```
//!
//! # Modules
//!
//! - [`environment`] - Environment tags, classification and the credential registry
//! - [`keys`] - Private key sources and loading
//! - [`signing`] - Signing string assembly, RSA signing and header emission
//! - [`error`] - Error types

pub mod environment;
pub mod error;
pub mod keys;
pub mod signing;

pub use environment::{CredentialRegistry, CredentialSet, Environment};
pub use error::AuthError;
pub use keys::KeySource;
pub use signing::{
    RequestContent, RequestSigner, SignatureHeaders, SignedHeaders, SigningRequest,
    authorization_header, digest_body, sign_with_key,
};
