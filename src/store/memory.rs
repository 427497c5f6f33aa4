//! In-process [`CollectionStore`]
//!
//! Behaves like the remote store for the operations this crate uses: it
//! assigns identifiers, rejects children of unknown folders and keeps an
//! ordered log of completed calls. Latency, throttling and failures can be
//! injected to exercise the synchronizer.

use crate::error::ApiError;
use crate::store::{CollectionStore, CreatedRef};
use crate::tree::{
    locate_mut, Collection, CollectionInfo, CollectionSummary, FolderNode, Node, RequestNode,
};
use crate::types::{ApiKey, NodeId};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Map;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Completed store call, in completion order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    CreateCollection {
        id: String,
        name: String,
    },
    CreateFolder {
        collection: String,
        parent: Option<NodeId>,
        id: NodeId,
        name: String,
    },
    CreateRequest {
        collection: String,
        parent: Option<NodeId>,
        id: NodeId,
        name: String,
    },
    UpdateRequest {
        collection: String,
        id: NodeId,
    },
    ReplaceCollection {
        collection: String,
    },
}

pub struct MemoryStore {
    collections: Mutex<BTreeMap<String, Collection>>,
    calls: Mutex<Vec<StoreCall>>,
    next_id: AtomicUsize,
    request_update: bool,
    latency: Option<Duration>,
    failing_requests: Mutex<HashSet<String>>,
    throttled_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            request_update: true,
            latency: None,
            failing_requests: Mutex::new(HashSet::new()),
            throttled_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Seed a collection under `id`
    pub fn with_collection(self, id: impl Into<String>, collection: Collection) -> Self {
        self.collections.lock().insert(id.into(), collection);
        self
    }

    /// Behave like a store without the single-request update operation
    pub fn without_request_update(mut self) -> Self {
        self.request_update = false;
        self
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Reject creation of requests with this name
    pub fn fail_request_named(self, name: impl Into<String>) -> Self {
        self.failing_requests.lock().insert(name.into());
        self
    }

    /// Answer the next `count` calls with a rate-limit error
    pub fn throttle_next(self, count: usize) -> Self {
        self.throttled_calls.store(count, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn collection(&self, id: &str) -> Option<Collection> {
        self.collections.lock().get(id).cloned()
    }

    /// Highest number of calls observed running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn enter(&self) -> Result<InFlight<'_>, ApiError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let throttled = self
            .throttled_calls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if throttled {
            return Err(ApiError::RemoteRateLimit("memory store throttled".to_string()));
        }
        Ok(guard)
    }

    /// Insert `node` under `parent` (or at the root) and return its new id
    fn insert(
        &self,
        collection_id: &str,
        parent: Option<&str>,
        mut node: Node,
        prefix: &str,
    ) -> Result<NodeId, ApiError> {
        let id = self.next_id(prefix);
        match &mut node {
            Node::Folder(folder) => folder.id = Some(id.clone()),
            Node::Request(request) => request.id = Some(id.clone()),
        }

        let mut collections = self.collections.lock();
        let collection = collections
            .get_mut(collection_id)
            .ok_or_else(|| ApiError::NotFound(format!("collection {}", collection_id)))?;
        let siblings = match parent {
            None => &mut collection.item,
            Some(parent_id) => match locate_mut(&mut collection.item, parent_id) {
                Some(Node::Folder(folder)) => &mut folder.children,
                Some(Node::Request(_)) => {
                    return Err(ApiError::RemoteError(format!(
                        "parent {} is a request, not a folder",
                        parent_id
                    )))
                }
                None => return Err(ApiError::NotFound(format!("folder {}", parent_id))),
            },
        };
        siblings.push(node);
        Ok(id)
    }
}

#[async_trait]
impl CollectionStore for MemoryStore {
    async fn list_collections(&self, _key: &ApiKey) -> Result<Vec<CollectionSummary>, ApiError> {
        let _guard = self.enter().await?;
        Ok(self
            .collections
            .lock()
            .iter()
            .map(|(id, collection)| CollectionSummary {
                id: id.clone(),
                name: collection.info.name.clone(),
                uid: None,
            })
            .collect())
    }

    async fn fetch_collection(
        &self,
        _key: &ApiKey,
        collection_id: &str,
    ) -> Result<Collection, ApiError> {
        let _guard = self.enter().await?;
        self.collection(collection_id)
            .ok_or_else(|| ApiError::NotFound(format!("collection {}", collection_id)))
    }

    async fn create_collection(
        &self,
        _key: &ApiKey,
        name: &str,
        _workspace_id: Option<&str>,
    ) -> Result<CollectionSummary, ApiError> {
        let _guard = self.enter().await?;
        let id = self.next_id("col");
        let collection = Collection {
            info: CollectionInfo {
                id: Some(id.clone()),
                name: name.to_string(),
                schema: Some(crate::store::postman::COLLECTION_SCHEMA.to_string()),
                extra: Map::new(),
            },
            item: Vec::new(),
            extra: Map::new(),
        };
        self.collections.lock().insert(id.clone(), collection);
        self.calls.lock().push(StoreCall::CreateCollection {
            id: id.clone(),
            name: name.to_string(),
        });
        Ok(CollectionSummary {
            id,
            name: name.to_string(),
            uid: None,
        })
    }

    async fn create_folder(
        &self,
        _key: &ApiKey,
        collection_id: &str,
        parent_folder: Option<&str>,
        name: &str,
    ) -> Result<CreatedRef, ApiError> {
        let _guard = self.enter().await?;
        let folder = Node::Folder(FolderNode::new(name, Vec::new()));
        let id = self.insert(collection_id, parent_folder, folder, "fld")?;
        self.calls.lock().push(StoreCall::CreateFolder {
            collection: collection_id.to_string(),
            parent: parent_folder.map(str::to_string),
            id: id.clone(),
            name: name.to_string(),
        });
        Ok(CreatedRef { id })
    }

    async fn create_request(
        &self,
        _key: &ApiKey,
        collection_id: &str,
        parent_folder: Option<&str>,
        request: &RequestNode,
    ) -> Result<CreatedRef, ApiError> {
        let _guard = self.enter().await?;
        if self.failing_requests.lock().contains(&request.name) {
            return Err(ApiError::RemoteError(format!(
                "validation failed for request '{}'",
                request.name
            )));
        }
        let id = self.insert(
            collection_id,
            parent_folder,
            Node::Request(request.clone()),
            "req",
        )?;
        self.calls.lock().push(StoreCall::CreateRequest {
            collection: collection_id.to_string(),
            parent: parent_folder.map(str::to_string),
            id: id.clone(),
            name: request.name.clone(),
        });
        Ok(CreatedRef { id })
    }

    fn supports_request_update(&self) -> bool {
        self.request_update
    }

    async fn update_request(
        &self,
        _key: &ApiKey,
        collection_id: &str,
        request_id: &str,
        request: &RequestNode,
    ) -> Result<RequestNode, ApiError> {
        if !self.request_update {
            return Err(ApiError::Unsupported(
                "store has no single-request update".to_string(),
            ));
        }
        let _guard = self.enter().await?;
        let mut updated = request.clone();
        updated.id = Some(request_id.to_string());
        {
            let mut collections = self.collections.lock();
            let collection = collections
                .get_mut(collection_id)
                .ok_or_else(|| ApiError::NotFound(format!("collection {}", collection_id)))?;
            match locate_mut(&mut collection.item, request_id) {
                Some(node) if matches!(node, Node::Request(_)) => {
                    *node = Node::Request(updated.clone())
                }
                _ => return Err(ApiError::NotFound(format!("request {}", request_id))),
            }
        }
        self.calls.lock().push(StoreCall::UpdateRequest {
            collection: collection_id.to_string(),
            id: request_id.to_string(),
        });
        Ok(updated)
    }

    async fn replace_collection(
        &self,
        _key: &ApiKey,
        collection_id: &str,
        collection: &Collection,
    ) -> Result<Collection, ApiError> {
        let _guard = self.enter().await?;
        {
            let mut collections = self.collections.lock();
            let slot = collections
                .get_mut(collection_id)
                .ok_or_else(|| ApiError::NotFound(format!("collection {}", collection_id)))?;
            *slot = collection.clone();
        }
        self.calls.lock().push(StoreCall::ReplaceCollection {
            collection: collection_id.to_string(),
        });
        Ok(collection.clone())
    }
}
