//! Collection workflows
//!
//! The top-level operations offered to users. Each one fetches the source
//! collection once and then either replicates it, patches a single request,
//! or feeds a textual projection of it to the content generator.

use crate::error::ApiError;
use crate::generation::parse::clean_script;
use crate::generation::{ContentGenerator, GenerationKind, GenerationTask};
use crate::store::CollectionStore;
use crate::sync::{RemoteCallLimiter, SyncConfig, SyncReport, TreeSynchronizer};
use crate::tree::{
    analysis_summary, audit_summary, endpoint_summaries, flatten, inject_test_script, locate,
    locate_mut, Collection, CollectionSummary, EndpointDescriptor, Node, RequestNode,
};
use crate::types::{ApiKey, Credentials};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Suffix appended to the name of a generated collection
pub const GENERATED_SUFFIX: &str = "[AI Examples]";

const REQUEST_NOT_FOUND: &str = "Request not found in collection";

/// Web link for a collection
pub fn collection_link(collection_id: &str) -> String {
    format!("https://go.postman.co/collection/{}", collection_id)
}

/// Result of replicating a collection with generated examples
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedCollection {
    pub source_id: String,
    pub collection_id: String,
    pub name: String,
    pub link: String,
    pub report: SyncReport,
}

/// How an injected test script was written back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistPath {
    RequestUpdate,
    CollectionReplace,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestScriptOutcome {
    pub collection_id: String,
    pub request_id: String,
    pub request_name: String,
    pub script: String,
    pub persisted_via: PersistPath,
}

/// Generated text report about a collection
#[derive(Debug, Clone, Serialize)]
pub struct CollectionReport {
    pub collection_id: String,
    pub collection_name: String,
    pub kind: GenerationKind,
    pub endpoint_count: usize,
    pub content: String,
}

/// Entry point for every user-facing operation
pub struct CollectionService {
    store: Arc<dyn CollectionStore>,
    generator: Arc<dyn ContentGenerator>,
    sync_config: SyncConfig,
    limiter: RemoteCallLimiter,
}

impl CollectionService {
    pub fn new(
        store: Arc<dyn CollectionStore>,
        generator: Arc<dyn ContentGenerator>,
        sync_config: SyncConfig,
    ) -> Self {
        let limiter = RemoteCallLimiter::new(&sync_config);
        Self {
            store,
            generator,
            sync_config,
            limiter,
        }
    }

    pub async fn list_collections(&self, key: &ApiKey) -> Result<Vec<CollectionSummary>, ApiError> {
        let store = &*self.store;
        self.limiter
            .run("list collections", move || store.list_collections(key))
            .await
    }

    pub async fn collection_details(
        &self,
        key: &ApiKey,
        collection_id: &str,
    ) -> Result<Collection, ApiError> {
        let store = &*self.store;
        self.limiter
            .run("fetch collection", move || {
                store.fetch_collection(key, collection_id)
            })
            .await
    }

    async fn generate(
        &self,
        key: &ApiKey,
        operation: &str,
        task: &GenerationTask,
    ) -> Result<String, ApiError> {
        let generator = &*self.generator;
        self.limiter
            .run(operation, move || generator.generate(task, key))
            .await
    }

    /// Copy a collection into a new `"<name> [AI Examples]"` collection,
    /// filling requests with generated example content.
    pub async fn generate_examples(
        &self,
        credentials: &Credentials,
        collection_id: &str,
        workspace_id: Option<&str>,
    ) -> Result<GeneratedCollection, ApiError> {
        let source = self.collection_details(&credentials.store, collection_id).await?;
        let name = format!("{} {}", source.info.name, GENERATED_SUFFIX);

        let store = &*self.store;
        let key = &credentials.store;
        let target_name = name.as_str();
        let created = self
            .limiter
            .run("create collection", move || {
                store.create_collection(key, target_name, workspace_id)
            })
            .await?;
        info!(
            source = collection_id,
            target = %created.id,
            name = %name,
            "Created destination collection"
        );

        let synchronizer = TreeSynchronizer::new(
            Arc::clone(&self.store),
            Arc::clone(&self.generator),
            credentials.clone(),
            &self.sync_config,
        );
        let report = synchronizer
            .synchronize(&source.item, &created.id, None)
            .await?;

        Ok(GeneratedCollection {
            source_id: collection_id.to_string(),
            link: collection_link(&created.id),
            collection_id: created.id,
            name,
            report,
        })
    }

    /// Generate a test script for one request and store it at the front of
    /// the request's "test" event. Folders and requests without a URL are
    /// reported as not found.
    ///
    /// This is a read-modify-write against the store: changes made to the
    /// request between the fetch and the write are overwritten.
    pub async fn generate_test_script(
        &self,
        credentials: &Credentials,
        collection_id: &str,
        request_id: &str,
    ) -> Result<TestScriptOutcome, ApiError> {
        let mut collection = self.collection_details(&credentials.store, collection_id).await?;
        let request = match locate(&collection.item, request_id) {
            Some(Node::Request(request)) if request.has_resolvable_url() => request.clone(),
            _ => return Err(ApiError::NotFound(REQUEST_NOT_FOUND.to_string())),
        };

        let task = GenerationTask::TestScript {
            name: request.name.clone(),
            request: serde_json::to_value(&request)?,
        };
        let text = self
            .generate(&credentials.generator, "generate test script", &task)
            .await?;
        let script = clean_script(&text);
        if script.is_empty() {
            return Err(ApiError::MalformedGenerationOutput(
                "generated test script is empty".to_string(),
            ));
        }

        let patched = inject_test_script(&request, &script, Utc::now());
        let persisted_via = self
            .persist_request(credentials, collection_id, request_id, &patched, &mut collection)
            .await?;
        info!(
            collection_id,
            request_id,
            request = %request.name,
            via = ?persisted_via,
            "Stored generated test script"
        );

        Ok(TestScriptOutcome {
            collection_id: collection_id.to_string(),
            request_id: request_id.to_string(),
            request_name: request.name,
            script,
            persisted_via,
        })
    }

    async fn persist_request(
        &self,
        credentials: &Credentials,
        collection_id: &str,
        request_id: &str,
        patched: &RequestNode,
        collection: &mut Collection,
    ) -> Result<PersistPath, ApiError> {
        let store = &*self.store;
        let key = &credentials.store;

        if store.supports_request_update() {
            self.limiter
                .run("update request", move || {
                    store.update_request(key, collection_id, request_id, patched)
                })
                .await?;
            return Ok(PersistPath::RequestUpdate);
        }

        warn!(
            collection_id,
            "Store cannot update a single request, replacing the whole collection"
        );
        match locate_mut(&mut collection.item, request_id) {
            Some(node) => *node = Node::Request(patched.clone()),
            None => return Err(ApiError::NotFound(REQUEST_NOT_FOUND.to_string())),
        }
        let collection = &*collection;
        self.limiter
            .run("replace collection", move || {
                store.replace_collection(key, collection_id, collection)
            })
            .await?;
        Ok(PersistPath::CollectionReplace)
    }

    /// Security and performance review of every endpoint
    pub async fn audit_collection(
        &self,
        credentials: &Credentials,
        collection_id: &str,
    ) -> Result<CollectionReport, ApiError> {
        let collection = self.collection_details(&credentials.store, collection_id).await?;
        let endpoints = flatten(&collection.item);
        let task = GenerationTask::SecurityAudit {
            summary: audit_summary(&collection.info.name, &endpoints),
        };
        let content = self
            .generate(&credentials.generator, "generate security audit", &task)
            .await?;
        Ok(report(collection_id, &collection, &endpoints, task.kind(), content))
    }

    /// Markdown reference documentation for the collection
    pub async fn document_collection(
        &self,
        credentials: &Credentials,
        collection_id: &str,
    ) -> Result<CollectionReport, ApiError> {
        let collection = self.collection_details(&credentials.store, collection_id).await?;
        let endpoints = flatten(&collection.item);
        let mut summary = analysis_summary(&collection.info.name, &collection.item);
        summary.push_str("\n\nEndpoint details:\n");
        for endpoint in &endpoints {
            summary.push_str(&format!(
                "- {} {} ({}) auth: {}, headers: {}\n",
                endpoint.method, endpoint.path, endpoint.url, endpoint.auth, endpoint.headers
            ));
        }
        let task = GenerationTask::ApiDocs { summary };
        let content = self
            .generate(&credentials.generator, "generate documentation", &task)
            .await?;
        Ok(report(collection_id, &collection, &endpoints, task.kind(), content))
    }

    /// High-level explanation of what the API does
    pub async fn analyze_collection(
        &self,
        credentials: &Credentials,
        collection_id: &str,
    ) -> Result<CollectionReport, ApiError> {
        let collection = self.collection_details(&credentials.store, collection_id).await?;
        let endpoint_count = endpoint_summaries(&collection.item).len();
        let task = GenerationTask::CollectionAnalysis {
            summary: analysis_summary(&collection.info.name, &collection.item),
        };
        let content = self
            .generate(&credentials.generator, "generate analysis", &task)
            .await?;
        Ok(CollectionReport {
            collection_id: collection_id.to_string(),
            collection_name: collection.info.name,
            kind: task.kind(),
            endpoint_count,
            content,
        })
    }
}

fn report(
    collection_id: &str,
    collection: &Collection,
    endpoints: &[EndpointDescriptor],
    kind: GenerationKind,
    content: String,
) -> CollectionReport {
    CollectionReport {
        collection_id: collection_id.to_string(),
        collection_name: collection.info.name.clone(),
        kind,
        endpoint_count: endpoints.len(),
        content,
    }
}
