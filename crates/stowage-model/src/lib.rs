//! Wire types for the stowage object-storage API.
//!
//! Plain serde types, no behavior: bodies exchanged with the Object Storage
//! and Identity APIs, pages of the identity-directory client, and the
//! request/response bodies of the stowage HTTP API itself.
//!
//! # Modules
//!
//! - [`storage`] - Object Storage request and response bodies
//! - [`identity`] - Compartment listings
//! - [`directory`] - Directory tokens and `memberOf` pages
//! - [`api`] - The stowage HTTP API's own bodies

pub mod api;
pub mod directory;
pub mod identity;
pub mod storage;
