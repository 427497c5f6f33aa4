//! Postman API implementation of [`CollectionStore`]

use crate::error::ApiError;
use crate::store::{CollectionStore, CreatedRef, StoreConfig};
use crate::tree::{Collection, CollectionSummary, RequestNode, RequestUrl};
use crate::types::ApiKey;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

/// Schema URL stamped on collections created by this crate
pub const COLLECTION_SCHEMA: &str =
    "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

pub struct PostmanStore {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CollectionsEnvelope {
    #[serde(default)]
    collections: Vec<CollectionSummary>,
}

#[derive(Debug, Deserialize)]
struct CollectionEnvelope<T> {
    collection: T,
}

#[derive(Debug, Deserialize)]
struct CreatedEnvelope {
    #[serde(default)]
    data: Option<CreatedRef>,
    #[serde(default)]
    model_id: Option<String>,
}

impl CreatedEnvelope {
    fn into_ref(self, what: &str) -> Result<CreatedRef, ApiError> {
        self.data
            .or_else(|| self.model_id.map(|id| CreatedRef { id }))
            .ok_or_else(|| {
                ApiError::RemoteOutcomeUnknown(format!("{} response carried no id", what))
            })
    }
}

impl PostmanStore {
    pub fn new(config: &StoreConfig) -> Result<Self, ApiError> {
        config.validate().map_err(ApiError::ConfigError)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        key: &ApiKey,
        what: &str,
    ) -> Result<T, ApiError> {
        let request = request
            .header("x-api-key", key.expose())
            .build()
            .map_err(|e| ApiError::ConfigError(format!("{}: invalid request: {}", what, e)))?;
        let idempotent = request.method() != reqwest::Method::POST;

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| transport_error(what, &e, e.is_connect(), idempotent))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(operation = what, status = status.as_u16(), detail = %detail, "Collection store call failed");
            return Err(status_error(status.as_u16(), what, &detail));
        }

        debug!(operation = what, status = status.as_u16(), "Collection store call succeeded");
        response.json::<T>().await.map_err(|e| {
            ApiError::RemoteOutcomeUnknown(format!("{}: unreadable response: {}", what, e))
        })
    }
}

/// Failure before a response arrived. Only a refused connection proves a
/// create never reached the store.
fn transport_error(
    what: &str,
    err: &dyn std::fmt::Display,
    before_send: bool,
    idempotent: bool,
) -> ApiError {
    if before_send || idempotent {
        ApiError::RemoteError(format!("{}: {}", what, err))
    } else {
        ApiError::RemoteOutcomeUnknown(format!("{}: {}", what, err))
    }
}

fn status_error(status: u16, what: &str, detail: &str) -> ApiError {
    match status {
        401 | 403 => ApiError::AuthFailure(format!("{} ({}): {}", what, status, detail)),
        404 => ApiError::NotFound(format!("{}: {}", what, detail)),
        429 => ApiError::RemoteRateLimit(format!("{}: {}", what, detail)),
        _ => ApiError::RemoteError(format!("{} ({}): {}", what, status, detail)),
    }
}

/// Body for the single-request update endpoint, which takes the flat
/// request format rather than the item shape.
fn update_payload(request: &RequestNode) -> Value {
    let payload = &request.request;
    let mut body = json!({
        "name": request.name,
        "method": payload.method.as_str(),
        "events": request.events.clone().unwrap_or_default(),
    });
    // The update endpoint patches; an empty url would clear the stored one
    if let Some(url) = payload.url.as_ref().and_then(RequestUrl::resolved) {
        body["url"] = json!(url);
    }
    if let Some(description) = &payload.description {
        body["description"] = description.clone();
    }
    if let Some(header) = &payload.header {
        body["headerData"] = serde_json::to_value(header).unwrap_or(Value::Null);
    }
    if let Some(raw) = payload.body.as_ref().and_then(|b| b.raw.as_ref()) {
        body["dataMode"] = json!("raw");
        body["rawModeData"] = json!(raw);
    }
    body
}

#[async_trait]
impl CollectionStore for PostmanStore {
    async fn list_collections(&self, key: &ApiKey) -> Result<Vec<CollectionSummary>, ApiError> {
        let envelope: CollectionsEnvelope = self
            .send(self.http.get(self.url("/collections")), key, "list collections")
            .await?;
        Ok(envelope.collections)
    }

    async fn fetch_collection(
        &self,
        key: &ApiKey,
        collection_id: &str,
    ) -> Result<Collection, ApiError> {
        let envelope: CollectionEnvelope<Collection> = self
            .send(
                self.http.get(self.url(&format!("/collections/{}", collection_id))),
                key,
                "fetch collection",
            )
            .await?;
        Ok(envelope.collection)
    }

    async fn create_collection(
        &self,
        key: &ApiKey,
        name: &str,
        workspace_id: Option<&str>,
    ) -> Result<CollectionSummary, ApiError> {
        let mut request = self.http.post(self.url("/collections")).json(&json!({
            "collection": {
                "info": { "name": name, "schema": COLLECTION_SCHEMA },
                "item": []
            }
        }));
        if let Some(workspace) = workspace_id {
            request = request.query(&[("workspace", workspace)]);
        }
        let envelope: CollectionEnvelope<CollectionSummary> =
            self.send(request, key, "create collection").await?;
        Ok(envelope.collection)
    }

    async fn create_folder(
        &self,
        key: &ApiKey,
        collection_id: &str,
        parent_folder: Option<&str>,
        name: &str,
    ) -> Result<CreatedRef, ApiError> {
        let mut body = json!({ "name": name });
        if let Some(parent) = parent_folder {
            body["folder"] = json!(parent);
        }
        let envelope: CreatedEnvelope = self
            .send(
                self.http
                    .post(self.url(&format!("/collections/{}/folders", collection_id)))
                    .json(&body),
                key,
                "create folder",
            )
            .await?;
        envelope.into_ref("create folder")
    }

    async fn create_request(
        &self,
        key: &ApiKey,
        collection_id: &str,
        parent_folder: Option<&str>,
        request: &RequestNode,
    ) -> Result<CreatedRef, ApiError> {
        let description = request
            .request
            .description
            .clone()
            .unwrap_or_else(|| json!(""));
        let mut builder = self
            .http
            .post(self.url(&format!("/collections/{}/requests", collection_id)))
            .json(&json!({
                "name": request.name,
                "description": description,
                "request": request.request,
            }));
        if let Some(folder) = parent_folder {
            builder = builder.query(&[("folder", folder)]);
        }
        let envelope: CreatedEnvelope = self.send(builder, key, "create request").await?;
        envelope.into_ref("create request")
    }

    async fn update_request(
        &self,
        key: &ApiKey,
        collection_id: &str,
        request_id: &str,
        request: &RequestNode,
    ) -> Result<RequestNode, ApiError> {
        let _: Value = self
            .send(
                self.http
                    .put(self.url(&format!(
                        "/collections/{}/requests/{}",
                        collection_id, request_id
                    )))
                    .json(&update_payload(request)),
                key,
                "update request",
            )
            .await?;
        Ok(request.clone())
    }

    async fn replace_collection(
        &self,
        key: &ApiKey,
        collection_id: &str,
        collection: &Collection,
    ) -> Result<Collection, ApiError> {
        let _: Value = self
            .send(
                self.http
                    .put(self.url(&format!("/collections/{}", collection_id)))
                    .json(&json!({ "collection": collection })),
                key,
                "replace collection",
            )
            .await?;
        Ok(collection.clone())
    }
}
