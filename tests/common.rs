#![allow(dead_code)]

use figma_squeeze::config::{FigmaConfig, PipelineConfig, SignedUploadConfig, StorageConfig};
use figma_squeeze::{ExportPipeline, StorageProvider};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub const FILE_KEY: &str = "FileKey123";
pub const SVG_BODY: &str = "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"8\" height=\"8\"/>";

pub fn create_temp_directory() -> TempDir {
    TempDir::new().unwrap()
}

pub fn create_test_image_files(temp_dir: &Path) -> Vec<PathBuf> {
    let files = vec![
        temp_dir.join("icon.png"),
        temp_dir.join("photo.jpg"),
        temp_dir.join("logo.svg"),
        temp_dir.join("readme.txt"),
    ];
    for file in &files {
        File::create(file)
            .unwrap()
            .write_all(b"fake image data")
            .unwrap();
    }
    files
}

pub fn signed_storage_config(server_url: &str) -> StorageConfig {
    StorageConfig {
        custom: SignedUploadConfig {
            upload_url: Some(format!("{}/upload", server_url)),
            secret_key: Some("test-secret".to_string()),
        },
        ..StorageConfig::default()
    }
}

pub fn signed_provider(server_url: &str) -> StorageProvider {
    StorageProvider::from_config(&signed_storage_config(server_url), Duration::from_secs(5)).unwrap()
}

pub fn test_figma_config(server_url: &str) -> FigmaConfig {
    FigmaConfig::new("test-token").with_api_base_url(server_url)
}

pub fn test_pipeline_config(temp_dir: &Path, max_retries: u32) -> PipelineConfig {
    PipelineConfig {
        staging_dir: temp_dir.join("staging"),
        max_retries,
        backoff_base: Duration::from_millis(1),
        download_timeout: Duration::from_secs(5),
        upload_timeout: Duration::from_secs(5),
        pngquant_path: temp_dir.join("no-pngquant-here"),
    }
}

/// A pipeline pointed at a mock server, staging under `temp_dir/staging`.
pub fn test_pipeline(server_url: &str, temp_dir: &Path, max_retries: u32) -> ExportPipeline {
    ExportPipeline::from_storage_config(
        &test_figma_config(server_url),
        &signed_storage_config(server_url),
        &test_pipeline_config(temp_dir, max_retries),
    )
    .unwrap()
}

pub fn children_body(parent: &str, children: &[(&str, &str)]) -> String {
    let children: Vec<serde_json::Value> = children
        .iter()
        .map(|(id, name)| serde_json::json!({ "id": id, "name": name, "type": "COMPONENT" }))
        .collect();
    let mut nodes = serde_json::Map::new();
    nodes.insert(
        parent.to_string(),
        serde_json::json!({ "document": { "id": parent, "name": "Icons", "children": children } }),
    );
    serde_json::json!({ "name": "Design System", "nodes": nodes }).to_string()
}

pub fn images_body(images: &[(&str, Option<String>)]) -> String {
    let map: serde_json::Map<String, serde_json::Value> = images
        .iter()
        .map(|(id, url)| {
            let value = match url {
                Some(url) => serde_json::Value::String(url.clone()),
                None => serde_json::Value::Null,
            };
            (id.to_string(), value)
        })
        .collect();
    serde_json::json!({ "err": null, "images": map }).to_string()
}
