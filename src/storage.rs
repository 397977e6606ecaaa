//! Storage backends for exported assets.
//!
//! The provider is picked once from [`StorageConfig`] and then shared by
//! reference; every variant turns a local file into a public URL.

use crate::config::{ProviderKind, SignedUploadConfig, StorageConfig};
use crate::constants::{MAX_UPLOAD_FILE_SIZE, UPLOAD_CONTENT_TYPE, UPLOAD_FILE_FIELD};
use crate::error::{ExportError, Result};
use crate::walrus::WalrusUploader;
use chrono::Utc;
use md5::{Digest, Md5};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Lowercase hex MD5 of `"{timestamp}:{secret}"`
pub fn sign(timestamp: i64, secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(format!("{}:{}", timestamp, secret).as_bytes());
    hex::encode(hasher.finalize())
}

/// Append the `ts`/`sign` query pair, respecting any query already present.
pub fn signed_url(upload_url: &str, timestamp: i64, secret: &str) -> String {
    let separator = if upload_url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}ts={}&sign={}",
        upload_url,
        separator,
        timestamp,
        sign(timestamp, secret)
    )
}

/// Pull the public URL out of an upload server response.
///
/// Accepts `{code: 0 | success: true, data: "<url>" | {url}}` and a bare
/// top-level `url`. Anything else yields the server's `message`.
pub fn parse_upload_response(body: &Value) -> std::result::Result<String, String> {
    let Some(object) = body.as_object() else {
        return Err("Unexpected response shape: expected a JSON object".to_string());
    };

    let top_level_url = || object.get("url").and_then(Value::as_str).map(str::to_string);

    let ok = object.get("code").and_then(Value::as_i64) == Some(0)
        || object.get("success").and_then(Value::as_bool) == Some(true);

    if ok {
        let from_data = match object.get("data") {
            Some(Value::String(url)) => Some(url.clone()),
            Some(Value::Object(data)) => data.get("url").and_then(Value::as_str).map(str::to_string),
            _ => None,
        };
        if let Some(url) = from_data.or_else(top_level_url) {
            return Ok(url);
        }
    } else if let Some(url) = top_level_url() {
        return Ok(url);
    }

    Err(object
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown server error")
        .to_string())
}

/// Multipart upload to a custom endpoint authenticated by a time-based signature
pub struct SignedUploader {
    client: Client,
    upload_url: String,
    secret_key: String,
}

impl SignedUploader {
    pub fn from_config(config: &SignedUploadConfig, timeout: Duration) -> Result<Self> {
        let upload_url = config.upload_url.clone().ok_or_else(|| {
            ExportError::UploadConfig("CUSTOM_UPLOAD_URL is not configured".to_string())
        })?;
        let secret_key = config.secret_key.clone().ok_or_else(|| {
            ExportError::UploadConfig("CUSTOM_SECRET_KEY is not configured".to_string())
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExportError::UploadConfig(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            upload_url,
            secret_key,
        })
    }

    pub async fn upload(&self, file_path: &Path) -> Result<String> {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ExportError::FileNotFound(file_path.to_path_buf()))?;

        let data = read_upload_file(file_path).await?;
        let timestamp = Utc::now().timestamp_millis();
        let url = signed_url(&self.upload_url, timestamp, &self.secret_key);

        let part = Part::bytes(data)
            .file_name(file_name.clone())
            .mime_str(UPLOAD_CONTENT_TYPE)?;
        let form = Form::new().part(UPLOAD_FILE_FIELD, part);

        debug!(file = %file_name, "Uploading via signed endpoint");

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            return Err(ExportError::UploadServer(format!(
                "HTTP error: {} {}",
                status.as_u16(),
                body.trim()
            )));
        }

        let json: Value = serde_json::from_str(&body).map_err(|e| {
            ExportError::UploadServer(format!("invalid JSON response: {}", e))
        })?;

        let public_url = parse_upload_response(&json).map_err(ExportError::UploadServer)?;
        info!(file = %file_name, url = %public_url, "Uploaded");
        Ok(public_url)
    }
}

/// Read a file for upload, refusing anything over the size cap.
pub(crate) async fn read_upload_file(file_path: &Path) -> Result<Vec<u8>> {
    let metadata = match tokio::fs::metadata(file_path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => return Err(ExportError::FileNotFound(file_path.to_path_buf())),
    };
    if metadata.len() > MAX_UPLOAD_FILE_SIZE {
        return Err(ExportError::Validation(format!(
            "file is too large to upload: {} bytes (max {} bytes)",
            metadata.len(),
            MAX_UPLOAD_FILE_SIZE
        )));
    }
    Ok(tokio::fs::read(file_path).await?)
}

pub enum StorageProvider {
    Signed(SignedUploader),
    Walrus(WalrusUploader),
}

impl StorageProvider {
    /// Build the configured provider; missing settings are fatal here.
    pub fn from_config(config: &StorageConfig, timeout: Duration) -> Result<Self> {
        let provider = match config.provider_kind()? {
            ProviderKind::Custom => {
                StorageProvider::Signed(SignedUploader::from_config(&config.custom, timeout)?)
            }
            ProviderKind::Walrus => {
                StorageProvider::Walrus(WalrusUploader::from_config(&config.walrus)?)
            }
        };
        info!(provider = provider.name(), "Storage provider ready");
        Ok(provider)
    }

    pub fn name(&self) -> &'static str {
        match self {
            StorageProvider::Signed(_) => ProviderKind::Custom.as_str(),
            StorageProvider::Walrus(_) => ProviderKind::Walrus.as_str(),
        }
    }

    /// Store one file and return its public URL.
    pub async fn upload(&self, file_path: &Path) -> Result<String> {
        match self {
            StorageProvider::Signed(uploader) => uploader.upload(file_path).await,
            StorageProvider::Walrus(uploader) => uploader.upload(file_path).await,
        }
    }
}
