//! Remote Collection Store
//!
//! The canonical collections live in a third-party service. Every operation
//! is an independent remote call taking the credential explicitly; created
//! nodes receive their identifiers from the store.

pub mod config;
pub mod memory;
pub mod postman;

use crate::error::ApiError;
use crate::tree::{Collection, CollectionSummary, RequestNode};
use crate::types::{ApiKey, NodeId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use config::StoreConfig;
pub use memory::MemoryStore;
pub use postman::PostmanStore;

/// Identifier returned for a newly created folder or request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRef {
    pub id: NodeId,
}

/// Remote collection store interface
#[async_trait]
pub trait CollectionStore: Send + Sync {
    async fn list_collections(&self, key: &ApiKey) -> Result<Vec<CollectionSummary>, ApiError>;

    async fn fetch_collection(&self, key: &ApiKey, collection_id: &str)
        -> Result<Collection, ApiError>;

    async fn create_collection(
        &self,
        key: &ApiKey,
        name: &str,
        workspace_id: Option<&str>,
    ) -> Result<CollectionSummary, ApiError>;

    /// Create a folder under `parent_folder`, or at the collection root
    async fn create_folder(
        &self,
        key: &ApiKey,
        collection_id: &str,
        parent_folder: Option<&str>,
        name: &str,
    ) -> Result<CreatedRef, ApiError>;

    /// Create a request under `parent_folder`, or at the collection root
    async fn create_request(
        &self,
        key: &ApiKey,
        collection_id: &str,
        parent_folder: Option<&str>,
        request: &RequestNode,
    ) -> Result<CreatedRef, ApiError>;

    /// Whether [`CollectionStore::update_request`] is available
    fn supports_request_update(&self) -> bool {
        true
    }

    async fn update_request(
        &self,
        _key: &ApiKey,
        _collection_id: &str,
        _request_id: &str,
        _request: &RequestNode,
    ) -> Result<RequestNode, ApiError> {
        Err(ApiError::Unsupported(
            "store has no single-request update".to_string(),
        ))
    }

    /// Resend the whole tree, replacing the stored collection
    async fn replace_collection(
        &self,
        key: &ApiKey,
        collection_id: &str,
        collection: &Collection,
    ) -> Result<Collection, ApiError>;
}
