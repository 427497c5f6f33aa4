//! Tree Synchronizer
//!
//! Replicates a source tree into a destination collection one level at a
//! time. Siblings are processed concurrently; a folder's children are only
//! dispatched once the folder exists remotely and its identifier is known.
//! Requests pick up generated example content on the way through.

pub mod limiter;

use crate::error::ApiError;
use crate::generation::parse::{parse_example_body, parse_query_params, strip_code_fences};
use crate::generation::{ContentGenerator, GenerationTask};
use crate::store::CollectionStore;
use crate::tree::{FolderNode, Method, Node, NodeKind, RequestBody, RequestNode, RequestUrl};
use crate::types::{Credentials, NodeId};
use futures::future::{try_join_all, BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

pub use limiter::RemoteCallLimiter;

fn default_max_concurrent_calls() -> usize {
    4
}

fn default_max_retry_attempts() -> usize {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_preserve_sibling_order() -> bool {
    true
}

/// Fan-out and retry settings for a synchronization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Remote calls allowed in flight at once
    #[serde(default = "default_max_concurrent_calls")]
    pub max_concurrent_calls: usize,

    /// Minimum spacing between remote call starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_call_interval_ms: Option<u64>,

    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: usize,

    /// Base delay, doubled on every retry
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Create siblings in source order
    #[serde(default = "default_preserve_sibling_order")]
    pub preserve_sibling_order: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: default_max_concurrent_calls(),
            min_call_interval_ms: None,
            max_retry_attempts: default_max_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            preserve_sibling_order: default_preserve_sibling_order(),
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_calls == 0 {
            return Err("sync.max_concurrent_calls must be at least 1".to_string());
        }
        if self.max_retry_attempts > 10 {
            return Err(format!(
                "sync.max_retry_attempts must be at most 10, got {}",
                self.max_retry_attempts
            ));
        }
        Ok(())
    }
}

/// Node created in the destination collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedNode {
    pub kind: NodeKind,
    pub id: NodeId,
    pub name: String,
    /// Destination folder, `None` for the collection root
    pub parent: Option<NodeId>,
}

/// Outcome of a completed synchronization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    pub collection_id: String,
    pub folders_created: usize,
    pub requests_created: usize,
    /// Names of requests skipped for lack of a URL
    pub skipped: Vec<String>,
    /// Created nodes in completion order
    pub created: Vec<CreatedNode>,
}

/// Turn in a chain of siblings: wait for the previous sibling's creation,
/// then release the next one.
struct OrderGate {
    wait: Option<oneshot::Receiver<()>>,
    release: Option<oneshot::Sender<()>>,
}

impl OrderGate {
    fn open() -> Self {
        Self {
            wait: None,
            release: None,
        }
    }

    fn chain(len: usize, ordered: bool) -> Vec<OrderGate> {
        if !ordered {
            return (0..len).map(|_| OrderGate::open()).collect();
        }
        let mut gates = Vec::with_capacity(len);
        let mut previous = None;
        for _ in 0..len {
            let (tx, rx) = oneshot::channel();
            gates.push(OrderGate {
                wait: previous.take(),
                release: Some(tx),
            });
            previous = Some(rx);
        }
        gates
    }

    async fn wait(&mut self) {
        if let Some(rx) = self.wait.take() {
            // A dropped sender means the previous sibling gave up; the whole
            // level is being torn down either way.
            let _ = rx.await;
        }
    }

    fn release(&mut self) {
        if let Some(tx) = self.release.take() {
            let _ = tx.send(());
        }
    }
}

pub struct TreeSynchronizer {
    store: Arc<dyn CollectionStore>,
    generator: Arc<dyn ContentGenerator>,
    credentials: Credentials,
    limiter: RemoteCallLimiter,
    preserve_sibling_order: bool,
}

/// State of one `synchronize` call
struct SyncRun<'s> {
    sync: &'s TreeSynchronizer,
    collection_id: &'s str,
    ledger: Mutex<Vec<CreatedNode>>,
    skipped: Mutex<Vec<String>>,
}

impl TreeSynchronizer {
    pub fn new(
        store: Arc<dyn CollectionStore>,
        generator: Arc<dyn ContentGenerator>,
        credentials: Credentials,
        config: &SyncConfig,
    ) -> Self {
        Self {
            store,
            generator,
            credentials,
            limiter: RemoteCallLimiter::new(config),
            preserve_sibling_order: config.preserve_sibling_order,
        }
    }

    /// Replicate `source` under `folder_id` (or the root) of the destination
    /// collection.
    ///
    /// Nothing is rolled back on failure: the error is
    /// [`ApiError::SyncAborted`] carrying every node created before it.
    pub async fn synchronize(
        &self,
        source: &[Node],
        collection_id: &str,
        folder_id: Option<&str>,
    ) -> Result<SyncReport, ApiError> {
        info!(
            collection_id,
            folder_id = folder_id.unwrap_or("<root>"),
            top_level_nodes = source.len(),
            "Starting collection synchronization"
        );

        let run = SyncRun {
            sync: self,
            collection_id,
            ledger: Mutex::new(Vec::new()),
            skipped: Mutex::new(Vec::new()),
        };
        let outcome = run.sync_level(source, folder_id).await;
        let created = run.ledger.into_inner();
        let skipped = run.skipped.into_inner();

        match outcome {
            Ok(()) => {
                let report = SyncReport {
                    collection_id: collection_id.to_string(),
                    folders_created: created
                        .iter()
                        .filter(|n| n.kind == NodeKind::Folder)
                        .count(),
                    requests_created: created
                        .iter()
                        .filter(|n| n.kind == NodeKind::Request)
                        .count(),
                    skipped,
                    created,
                };
                info!(
                    collection_id,
                    folders = report.folders_created,
                    requests = report.requests_created,
                    skipped = report.skipped.len(),
                    "Synchronization completed"
                );
                Ok(report)
            }
            Err(source) => {
                error!(
                    collection_id,
                    created = created.len(),
                    error = %source,
                    "Synchronization aborted"
                );
                Err(ApiError::SyncAborted {
                    source: Box::new(source),
                    created,
                })
            }
        }
    }
}

impl<'s> SyncRun<'s> {
    fn sync_level<'a>(
        &'a self,
        nodes: &'a [Node],
        parent: Option<&'a str>,
    ) -> BoxFuture<'a, Result<(), ApiError>> {
        async move {
            let gates = OrderGate::chain(nodes.len(), self.sync.preserve_sibling_order);
            let siblings = nodes
                .iter()
                .zip(gates)
                .map(|(node, gate)| self.sync_node(node, parent, gate));
            try_join_all(siblings).await?;
            Ok(())
        }
        .boxed()
    }

    async fn sync_node(
        &self,
        node: &Node,
        parent: Option<&str>,
        mut gate: OrderGate,
    ) -> Result<(), ApiError> {
        match node {
            Node::Folder(folder) => {
                gate.wait().await;
                let id = self.create_folder(folder, parent).await?;
                gate.release();
                self.sync_level(&folder.children, Some(id.as_str())).await
            }
            Node::Request(request) if !request.has_resolvable_url() => {
                warn!(request = %request.name, "Skipping request without a URL");
                gate.wait().await;
                self.skipped.lock().push(request.name.clone());
                gate.release();
                Ok(())
            }
            Node::Request(request) => {
                let outgoing = self.prepare_request(request).await?;
                gate.wait().await;
                self.create_request(&outgoing, parent).await?;
                gate.release();
                Ok(())
            }
        }
    }

    async fn create_folder(
        &self,
        folder: &FolderNode,
        parent: Option<&str>,
    ) -> Result<NodeId, ApiError> {
        let store = &*self.sync.store;
        let key = &self.sync.credentials.store;
        let collection_id = self.collection_id;
        let name = folder.name.as_str();

        let created = self
            .sync
            .limiter
            .run("create folder", move || {
                store.create_folder(key, collection_id, parent, name)
            })
            .await?;

        debug!(folder = %folder.name, id = %created.id, "Created folder");
        self.record(NodeKind::Folder, &created.id, &folder.name, parent);
        Ok(created.id)
    }

    async fn create_request(
        &self,
        request: &RequestNode,
        parent: Option<&str>,
    ) -> Result<(), ApiError> {
        let store = &*self.sync.store;
        let key = &self.sync.credentials.store;
        let collection_id = self.collection_id;

        let created = self
            .sync
            .limiter
            .run("create request", move || {
                store.create_request(key, collection_id, parent, request)
            })
            .await?;

        debug!(
            request = %request.name,
            method = %request.method(),
            id = %created.id,
            "Created request"
        );
        self.record(NodeKind::Request, &created.id, &request.name, parent);
        Ok(())
    }

    fn record(&self, kind: NodeKind, id: &str, name: &str, parent: Option<&str>) {
        self.ledger.lock().push(CreatedNode {
            kind,
            id: id.to_string(),
            name: name.to_string(),
            parent: parent.map(str::to_string),
        });
    }

    async fn generate(&self, operation: &str, task: &GenerationTask) -> Result<String, ApiError> {
        let generator = &*self.sync.generator;
        let key = &self.sync.credentials.generator;
        self.sync
            .limiter
            .run(operation, move || generator.generate(task, key))
            .await
    }

    /// Outgoing copy of `request` with a structured URL and generated
    /// example content. The copy carries no id; the store assigns one.
    async fn prepare_request(&self, request: &RequestNode) -> Result<RequestNode, ApiError> {
        let mut outgoing = request.clone();
        outgoing.id = None;

        let mut url = request
            .request
            .url
            .as_ref()
            .map(RequestUrl::normalized)
            .unwrap_or_default();
        let path = url.joined_path();
        let method = request.method();

        if method.carries_body() {
            let task = GenerationTask::ExampleBody {
                name: request.name.clone(),
                method: method.as_str().to_string(),
                path,
                original_body: request.request.body.as_ref().and_then(RequestBody::parsed_json),
            };
            let text = self.generate("generate example body", &task).await?;
            match parse_example_body(&text) {
                Ok(_) => {
                    outgoing.request.body = Some(RequestBody::raw_json(strip_code_fences(&text)));
                }
                Err(err) => {
                    warn!(request = %request.name, error = %err, "Keeping original body");
                }
            }
        } else if method == Method::Get {
            let task = GenerationTask::ExampleQueryParams {
                name: request.name.clone(),
                path,
            };
            let text = self.generate("generate query parameters", &task).await?;
            match parse_query_params(&text) {
                Ok(params) if !params.is_empty() => url.query = Some(params),
                Ok(_) => debug!(request = %request.name, "No example query parameters generated"),
                Err(err) => {
                    warn!(request = %request.name, error = %err, "Ignoring query parameter output");
                }
            }
        }

        outgoing.request.url = Some(RequestUrl::Structured(url));
        Ok(outgoing)
    }
}
