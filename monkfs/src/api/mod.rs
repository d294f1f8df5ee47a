//! Remote Resource Client for the File API.
//!
//! Submodules:
//! - `client`: reqwest-backed [`FileApiClient`] with pooled connections
//! - `types`: envelope and payload wire types
//! - `error`: [`ApiError`] / [`ClientError`]
//!
//! The resolver only depends on the [`FileApi`] trait, so tests can swap the
//! HTTP client for an in-memory backend.

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;

pub use client::{ClientConfig, FileApiClient};
pub use error::{ApiError, ClientError};
pub use types::{
    Content, FieldHint, FileEntry, FileMetadata, ListOptions, ListResponse, RetrieveOptions,
    RetrieveResponse, StatResponse, StoreOptions, StoreResponse,
};

/// The three read operations of the File API, one round trip each.
#[async_trait]
pub trait FileApi: Send + Sync {
    async fn list(
        &self,
        path: &str,
        options: &ListOptions,
        hint: Option<FieldHint>,
    ) -> Result<ListResponse, ClientError>;

    async fn stat(&self, path: &str, hint: Option<FieldHint>) -> Result<StatResponse, ClientError>;

    async fn retrieve(
        &self,
        path: &str,
        options: RetrieveOptions,
        hint: Option<FieldHint>,
    ) -> Result<RetrieveResponse, ClientError>;
}
