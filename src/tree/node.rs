//! Collection tree node types
//!
//! The wire format is the Postman collection v2.1 item shape. Folders and
//! requests are told apart once, when an item is deserialized, and every
//! object keeps the fields this crate does not model in an `extra` map so
//! that writing a tree back never drops data.

use crate::types::NodeId;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Unmodeled wire fields carried through untouched
pub type Extras = Map<String, Value>;

/// Folder or request in a collection tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Folder(FolderNode),
    Request(RequestNode),
}

/// Discriminant of a [`Node`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    Request,
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let is_folder = value.get("item").map(Value::is_array).unwrap_or(false);
        if is_folder {
            return serde_json::from_value(value)
                .map(Node::Folder)
                .map_err(D::Error::custom);
        }
        if value.get("request").is_some() {
            return serde_json::from_value(value)
                .map(Node::Request)
                .map_err(D::Error::custom);
        }
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>");
        Err(D::Error::custom(format!(
            "collection item '{}' has neither an item list nor a request",
            name
        )))
    }
}

impl Node {
    pub fn id(&self) -> Option<&str> {
        match self {
            Node::Folder(folder) => folder.id.as_deref(),
            Node::Request(request) => request.id.as_deref(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Node::Folder(folder) => &folder.name,
            Node::Request(request) => &request.name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Folder(_) => NodeKind::Folder,
            Node::Request(_) => NodeKind::Request,
        }
    }

    pub fn as_request(&self) -> Option<&RequestNode> {
        match self {
            Node::Request(request) => Some(request),
            Node::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&FolderNode> {
        match self {
            Node::Folder(folder) => Some(folder),
            Node::Request(_) => None,
        }
    }
}

/// Folder node: ordered children, order is display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "item")]
    pub children: Vec<Node>,
    #[serde(flatten)]
    pub extra: Extras,
}

impl FolderNode {
    pub fn new(name: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            id: None,
            name: name.into(),
            children,
            extra: Extras::new(),
        }
    }
}

/// Request node: the request payload plus its event scripts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "payload_or_raw_url")]
    pub request: RequestPayload,
    #[serde(rename = "event", default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<Event>>,
    #[serde(flatten)]
    pub extra: Extras,
}

impl RequestNode {
    pub fn new(name: impl Into<String>, request: RequestPayload) -> Self {
        Self {
            id: None,
            name: name.into(),
            request,
            events: None,
            extra: Extras::new(),
        }
    }

    pub fn method(&self) -> Method {
        self.request.method.clone()
    }

    /// A request can only be replicated or tested when it points somewhere
    pub fn has_resolvable_url(&self) -> bool {
        match &self.request.url {
            None => false,
            Some(RequestUrl::Raw(raw)) => !raw.trim().is_empty(),
            Some(RequestUrl::Structured(parts)) => {
                parts.raw.as_deref().map(|r| !r.trim().is_empty()).unwrap_or(false)
                    || parts.host.is_some()
                    || !parts.joined_path().is_empty()
            }
        }
    }

    /// Event entry for a trigger name such as `"test"`
    pub fn event(&self, listen: &str) -> Option<&Event> {
        self.events
            .as_ref()
            .and_then(|events| events.iter().find(|e| e.listen == listen))
    }
}

/// Accepts the shorthand form where `request` is just a URL string
fn payload_or_raw_url<'de, D>(deserializer: D) -> Result<RequestPayload, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Url(String),
        Payload(RequestPayload),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Url(raw) => RequestPayload::get(RequestUrl::Raw(raw)),
        Repr::Payload(payload) => payload,
    })
}

/// HTTP method of a request. Verbs outside the standard set are kept
/// verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Copy,
    Link,
    Unlink,
    Purge,
    Lock,
    Unlock,
    Propfind,
    View,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Copy => "COPY",
            Method::Link => "LINK",
            Method::Unlink => "UNLINK",
            Method::Purge => "PURGE",
            Method::Lock => "LOCK",
            Method::Unlock => "UNLOCK",
            Method::Propfind => "PROPFIND",
            Method::View => "VIEW",
            Method::Other(verb) => verb,
        }
    }

    /// Standard verbs match case-insensitively; anything else becomes `Other`
    pub fn parse(verb: &str) -> Self {
        match verb.trim().to_ascii_uppercase().as_str() {
            "" | "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "PATCH" => Method::Patch,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "COPY" => Method::Copy,
            "LINK" => Method::Link,
            "UNLINK" => Method::Unlink,
            "PURGE" => Method::Purge,
            "LOCK" => Method::Lock,
            "UNLOCK" => Method::Unlock,
            "PROPFIND" => Method::Propfind,
            "VIEW" => Method::View,
            _ => Method::Other(verb.trim().to_string()),
        }
    }

    /// Methods whose requests carry a generated example body
    pub fn carries_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl Serialize for Method {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let verb = String::deserialize(deserializer)?;
        Ok(Method::parse(&verb))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload (`request` on the wire)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestPayload {
    #[serde(default)]
    pub method: Method,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<RequestUrl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<Auth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(flatten)]
    pub extra: Extras,
}

impl RequestPayload {
    pub fn new(method: Method, url: RequestUrl) -> Self {
        Self {
            method,
            url: Some(url),
            ..Self::default()
        }
    }

    pub fn get(url: RequestUrl) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Header keys in declaration order
    pub fn header_keys(&self) -> Vec<String> {
        match &self.header {
            None => Vec::new(),
            Some(HeaderList::Entries(entries)) => entries.iter().map(|h| h.key.clone()).collect(),
            Some(HeaderList::Raw(raw)) => raw
                .lines()
                .filter_map(|line| line.split_once(':'))
                .map(|(key, _)| key.trim().to_string())
                .filter(|key| !key.is_empty())
                .collect(),
        }
    }
}

/// Request URL: a bare string or the structured form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestUrl {
    Raw(String),
    Structured(UrlParts),
}

impl RequestUrl {
    /// Structured copy of this URL; a bare string only fills `raw`
    pub fn normalized(&self) -> UrlParts {
        match self {
            RequestUrl::Raw(raw) => UrlParts {
                raw: Some(raw.clone()),
                ..UrlParts::default()
            },
            RequestUrl::Structured(parts) => parts.clone(),
        }
    }

    pub fn raw(&self) -> Option<&str> {
        match self {
            RequestUrl::Raw(raw) => Some(raw),
            RequestUrl::Structured(parts) => parts.raw.as_deref(),
        }
    }

    /// URL text: `raw` when present, otherwise rebuilt from host and path
    pub fn resolved(&self) -> Option<String> {
        match self {
            RequestUrl::Raw(raw) if !raw.trim().is_empty() => Some(raw.clone()),
            RequestUrl::Raw(_) => None,
            RequestUrl::Structured(parts) => parts.resolved(),
        }
    }

    pub fn joined_path(&self) -> String {
        match self {
            RequestUrl::Raw(_) => String::new(),
            RequestUrl::Structured(parts) => parts.joined_path(),
        }
    }
}

/// Structured URL form
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UrlParts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<UrlPath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Vec<QueryParam>>,
    #[serde(flatten)]
    pub extra: Extras,
}

impl UrlParts {
    /// `raw` when present, otherwise `host/path`; `None` when both are empty
    pub fn resolved(&self) -> Option<String> {
        if let Some(raw) = self.raw.as_deref().filter(|r| !r.trim().is_empty()) {
            return Some(raw.to_string());
        }
        let host = match &self.host {
            Some(Value::String(host)) => host.clone(),
            Some(Value::Array(labels)) => labels
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("."),
            _ => String::new(),
        };
        let path = self.joined_path();
        match (host.is_empty(), path.is_empty()) {
            (true, true) => None,
            (false, true) => Some(host),
            (true, false) => Some(format!("/{}", path)),
            (false, false) => Some(format!("{}/{}", host, path)),
        }
    }

    /// Path segments joined by `/`; empty when there is no path
    pub fn joined_path(&self) -> String {
        match &self.path {
            None => String::new(),
            Some(UrlPath::Joined(path)) => path.clone(),
            Some(UrlPath::Segments(segments)) => segments
                .iter()
                .map(PathSegment::as_str)
                .collect::<Vec<_>>()
                .join("/"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UrlPath {
    Segments(Vec<PathSegment>),
    Joined(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Text(String),
    Described {
        value: String,
        #[serde(flatten)]
        extra: Extras,
    },
}

impl PathSegment {
    pub fn as_str(&self) -> &str {
        match self {
            PathSegment::Text(text) => text,
            PathSegment::Described { value, .. } => value,
        }
    }
}

/// Query parameter of a structured URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParam {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub extra: Extras,
}

impl QueryParam {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: Some(value.into()),
            extra: Extras::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderList {
    Entries(Vec<Header>),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub extra: Extras,
}

/// Auth block; only the type tag is interpreted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Auth {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Extras,
}

/// Request body
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(flatten)]
    pub extra: Extras,
}

impl RequestBody {
    /// Raw body declared as JSON
    pub fn raw_json(raw: impl Into<String>) -> Self {
        Self {
            mode: Some("raw".to_string()),
            raw: Some(raw.into()),
            options: Some(serde_json::json!({ "raw": { "language": "json" } })),
            extra: Extras::new(),
        }
    }

    /// Raw text parsed as JSON, when there is raw text and it parses
    pub fn parsed_json(&self) -> Option<Value> {
        self.raw
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

/// Event script attached to a request, keyed by trigger name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub listen: String,
    #[serde(default)]
    pub script: Script,
    #[serde(flatten)]
    pub extra: Extras,
}

impl Event {
    pub fn new(listen: impl Into<String>) -> Self {
        Self {
            listen: listen.into(),
            script: Script::javascript(),
            extra: Extras::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Script {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "script_lines")]
    pub exec: Vec<String>,
    #[serde(flatten)]
    pub extra: Extras,
}

impl Script {
    pub fn javascript() -> Self {
        Self {
            kind: Some("text/javascript".to_string()),
            exec: Vec::new(),
            extra: Extras::new(),
        }
    }
}

/// `exec` is either a single string or a list of lines
fn script_lines<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lines {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Lines::deserialize(deserializer)? {
        Lines::One(line) => vec![line],
        Lines::Many(lines) => lines,
    })
}

/// Whole collection as returned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub info: CollectionInfo,
    #[serde(default)]
    pub item: Vec<Node>,
    #[serde(flatten)]
    pub extra: Extras,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    #[serde(rename = "_postman_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(flatten)]
    pub extra: Extras,
}

/// Collection listing entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}
