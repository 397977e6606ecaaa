//! Figma REST API client
//!
//! Covers the three read-only queries the export pipeline needs:
//! - immediate children of parent nodes (`/files/{key}/nodes?depth=1`)
//! - human-readable names for nodes (same endpoint)
//! - transient render URLs for nodes (`/images/{key}`)

use crate::config::FigmaConfig;
use crate::constants::FIGMA_TOKEN_HEADER;
use crate::error::{ExportError, Result};
use crate::formats::ExportFormat;
use crate::utils::sanitize_file_name;
use crate::validation::validate_scale;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, error, info};

/// A design node and its sanitized display name, if it has one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub id: String,
    pub name: Option<String>,
}

impl NodeDescriptor {
    pub fn new(id: impl Into<String>, raw_name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: raw_name.and_then(sanitize_file_name),
        }
    }
}

/// Direct children of the requested parent nodes
#[derive(Debug, Clone, Default)]
pub struct ChildNodes {
    pub child_node_ids: Vec<String>,
    pub parent_nodes: Vec<String>,
    pub total_children: usize,
    pub children: Vec<NodeDescriptor>,
}

/// Validated render parameters for the image endpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageExportOptions {
    pub format: ExportFormat,
    pub scale: f64,
}

impl ImageExportOptions {
    /// Validate format and scale; nothing is sent when either is invalid.
    pub fn new(format: &str, scale: f64) -> Result<Self> {
        let format = ExportFormat::from_str(format)?;
        let scale = validate_scale(scale)?;
        Ok(Self { format, scale })
    }
}

/// Render URLs keyed by node id, in response order
#[derive(Debug, Clone, Default)]
pub struct ImageUrls {
    pub images: Vec<(String, Option<String>)>,
    pub failed_nodes: Vec<String>,
    pub err: Option<String>,
}

impl ImageUrls {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct NodesResponse {
    #[serde(default)]
    nodes: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct NodeEntry {
    document: Option<DocumentNode>,
}

#[derive(Debug, Deserialize)]
struct DocumentNode {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    children: Vec<ChildNode>,
}

#[derive(Debug, Deserialize)]
struct ChildNode {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    err: Option<String>,
    #[serde(default)]
    images: Map<String, Value>,
}

pub struct FigmaClient {
    client: Client,
    api_base_url: String,
    access_token: String,
}

impl FigmaClient {
    pub fn new(config: &FigmaConfig) -> Result<Self> {
        if config.access_token.trim().is_empty() {
            return Err(ExportError::Config(
                "a Figma access token is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExportError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    /// Collect the ids of the direct children of each parent node.
    ///
    /// An empty result is not an error here; callers decide whether
    /// "nothing to export" is fatal.
    pub async fn get_child_nodes(&self, file_key: &str, node_ids: &[String]) -> Result<ChildNodes> {
        let nodes = self.fetch_nodes(file_key, node_ids, "child node lookup").await?;

        let mut result = ChildNodes::default();
        for (parent_id, entry) in nodes {
            result.parent_nodes.push(parent_id);
            let Some(document) = entry.document else {
                continue;
            };
            for child in document.children {
                if let Some(id) = child.id.filter(|id| !id.is_empty()) {
                    result.child_node_ids.push(id.clone());
                    result
                        .children
                        .push(NodeDescriptor::new(id, child.name.as_deref()));
                }
            }
        }
        result.total_children = result.child_node_ids.len();

        info!(
            parents = result.parent_nodes.len(),
            children = result.total_children,
            "Resolved child nodes"
        );
        Ok(result)
    }

    /// Look up display names for nodes; nodes without a usable name are omitted.
    pub async fn get_node_names(
        &self,
        file_key: &str,
        node_ids: &[String],
    ) -> Result<HashMap<String, String>> {
        let nodes = self.fetch_nodes(file_key, node_ids, "node name lookup").await?;

        let names = nodes
            .into_iter()
            .filter_map(|(node_id, entry)| {
                let document = entry.document?;
                let descriptor = NodeDescriptor::new(node_id, document.name.as_deref());
                descriptor.name.map(|name| (descriptor.id, name))
            })
            .collect();
        Ok(names)
    }

    /// Request render URLs for the given nodes.
    pub async fn get_image_urls(
        &self,
        file_key: &str,
        node_ids: &[String],
        options: &ImageExportOptions,
    ) -> Result<ImageUrls> {
        let url = format!("{}/images/{}", self.api_base_url, file_key);
        let ids = node_ids.join(",");
        let scale = options.scale.to_string();

        debug!(url = %url, ids = %ids, format = %options.format, scale = options.scale, "Requesting image URLs");

        let response = self
            .client
            .get(&url)
            .header(FIGMA_TOKEN_HEADER, &self.access_token)
            .query(&[
                ("ids", ids.as_str()),
                ("format", options.format.as_str()),
                ("scale", scale.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(api_error(status, &body, "image export"));
        }

        let parsed: ImagesResponse = serde_json::from_str(&body)?;
        let mut result = ImageUrls {
            err: parsed.err,
            ..ImageUrls::default()
        };
        for (node_id, value) in parsed.images {
            let url = value
                .as_str()
                .filter(|u| !u.is_empty())
                .map(str::to_string);
            if url.is_none() {
                result.failed_nodes.push(node_id.clone());
            }
            result.images.push((node_id, url));
        }

        info!(
            images = result.images.len(),
            failed = result.failed_nodes.len(),
            "Fetched image URLs"
        );
        Ok(result)
    }

    async fn fetch_nodes(
        &self,
        file_key: &str,
        node_ids: &[String],
        operation: &str,
    ) -> Result<Vec<(String, NodeEntry)>> {
        let url = format!("{}/files/{}/nodes", self.api_base_url, file_key);
        let ids = node_ids.join(",");

        debug!(url = %url, ids = %ids, operation, "Requesting node metadata");

        let response = self
            .client
            .get(&url)
            .header(FIGMA_TOKEN_HEADER, &self.access_token)
            .query(&[("ids", ids.as_str()), ("depth", "1")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(api_error(status, &body, operation));
        }

        let parsed: NodesResponse = serde_json::from_str(&body)?;
        let mut nodes = Vec::with_capacity(parsed.nodes.len());
        for (node_id, value) in parsed.nodes {
            if value.is_null() {
                continue;
            }
            let entry: NodeEntry = serde_json::from_value(value)?;
            nodes.push((node_id, entry));
        }
        Ok(nodes)
    }
}

/// Map a non-200 API response to a typed error, enriched with any
/// `err`/`message` field found in the body.
pub fn api_error(status: StatusCode, body: &str, operation: &str) -> ExportError {
    let detail = error_detail(body);
    let err = match status {
        StatusCode::FORBIDDEN => ExportError::Auth(detail),
        StatusCode::NOT_FOUND => ExportError::NotFound(detail),
        StatusCode::TOO_MANY_REQUESTS => ExportError::RateLimited(detail),
        other => ExportError::Remote {
            status: other.as_u16(),
            detail,
        },
    };
    error!(status = status.as_u16(), operation, error = %err, "Figma API error");
    err
}

fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let field = value.get("err").or_else(|| value.get("message"))?;
    match field {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
