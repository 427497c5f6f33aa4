//! Flattened endpoint projections used as input to report generation

use crate::tree::node::{Node, RequestNode, RequestUrl};
use serde::{Deserialize, Serialize};

/// One request seen as an endpoint, with its folder path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// `/`-joined ancestor names plus the request's own name
    pub path: String,
    pub method: String,
    pub url: String,
    pub auth: String,
    pub headers: String,
}

const NONE: &str = "None";
const NO_URL: &str = "No URL defined";

/// Pre-order flattening; folders only contribute their descendants
pub fn flatten(nodes: &[Node]) -> Vec<EndpointDescriptor> {
    let mut out = Vec::new();
    flatten_into(nodes, "", &mut out);
    out
}

fn flatten_into(nodes: &[Node], prefix: &str, out: &mut Vec<EndpointDescriptor>) {
    for node in nodes {
        let path = format!("{}/{}", prefix, node.name());
        match node {
            Node::Folder(folder) => flatten_into(&folder.children, &path, out),
            Node::Request(request) => out.push(describe(request, path)),
        }
    }
}

fn describe(request: &RequestNode, path: String) -> EndpointDescriptor {
    let payload = &request.request;
    let url = payload
        .url
        .as_ref()
        .and_then(RequestUrl::resolved)
        .unwrap_or_else(|| NO_URL.to_string());
    let auth = payload
        .auth
        .as_ref()
        .map(|auth| auth.kind.clone())
        .unwrap_or_else(|| NONE.to_string());
    let keys = payload.header_keys();
    let headers = if keys.is_empty() {
        NONE.to_string()
    } else {
        keys.join(", ")
    };

    EndpointDescriptor {
        path,
        method: payload.method.to_string(),
        url,
        auth,
        headers,
    }
}

/// Text block describing every endpoint, sent with the audit request
pub fn audit_summary(collection_name: &str, endpoints: &[EndpointDescriptor]) -> String {
    let mut out = format!("Collection Name: \"{}\"\nRequests:\n", collection_name);
    for endpoint in endpoints {
        out.push_str(&format!(
            "\n- Path: {}\n  Method: {}\n  URL: {}\n  Auth: {}\n  Headers: [{}]\n",
            endpoint.path, endpoint.method, endpoint.url, endpoint.auth, endpoint.headers
        ));
    }
    out
}

/// `- METHOD /path` line per request that has a URL, with top-level body keys
pub fn endpoint_summaries(nodes: &[Node]) -> Vec<String> {
    let mut lines = Vec::new();
    collect_summaries(nodes, &mut lines);
    lines
}

fn collect_summaries(nodes: &[Node], lines: &mut Vec<String>) {
    for node in nodes {
        match node {
            Node::Folder(folder) => collect_summaries(&folder.children, lines),
            Node::Request(request) => {
                let Some(url) = request.request.url.as_ref() else {
                    continue;
                };
                let mut line = format!("- {} /{}", request.method(), url.joined_path());
                let keys = request
                    .request
                    .body
                    .as_ref()
                    .and_then(|body| body.parsed_json())
                    .and_then(|json| {
                        json.as_object()
                            .map(|object| object.keys().cloned().collect::<Vec<_>>())
                    })
                    .unwrap_or_default();
                if !keys.is_empty() {
                    line.push_str(&format!(" (Body keys: {})", keys.join(", ")));
                }
                lines.push(line);
            }
        }
    }
}

/// Text block describing the collection for analysis and documentation
pub fn analysis_summary(collection_name: &str, nodes: &[Node]) -> String {
    format!(
        "Collection Name: \"{}\"\n\nEndpoints:\n{}",
        collection_name,
        endpoint_summaries(nodes).join("\n")
    )
}
