use crate::config::WalrusConfig;
use crate::error::{ExportError, Result};
use crate::storage::read_upload_file;
use crate::utils::build_walrus_access_url;
use std::path::Path;
use tracing::{debug, info};
use walrus_rs::WalrusClient;

/// Stores exported files as blobs on Walrus decentralized storage
pub struct WalrusUploader {
    client: WalrusClient,
    aggregator_url: String,
    epochs: Option<u64>,
}

impl WalrusUploader {
    pub fn from_config(config: &WalrusConfig) -> Result<Self> {
        let client = WalrusClient::new(&config.aggregator_url, &config.publisher_url).map_err(|e| {
            ExportError::UploadConfig(format!("Failed to create Walrus client: {}", e))
        })?;

        Ok(Self {
            client,
            aggregator_url: config.aggregator_url.clone(),
            epochs: config.epochs,
        })
    }

    /// Store the file and return its aggregator access URL.
    pub async fn upload(&self, file_path: &Path) -> Result<String> {
        let data = read_upload_file(file_path).await?;
        debug!(path = ?file_path, size = data.len(), epochs = ?self.epochs, "Storing blob on Walrus");

        // Deletable so a re-export can replace the blob later
        let store_result = self
            .client
            .store_blob(data, self.epochs, Some(true), None, None)
            .await
            .map_err(|e| ExportError::UploadServer(format!("Failed to store blob: {}", e)))?;

        let blob_id = match store_result.newly_created {
            Some(newly_created) => newly_created.blob_object.blob_id,
            None => {
                return Err(ExportError::UploadServer(
                    "Failed to create new blob".to_string(),
                ))
            }
        };

        let access_url = build_walrus_access_url(&self.aggregator_url, &blob_id);
        info!(path = ?file_path, blob_id = %blob_id, url = %access_url, "Stored blob");
        Ok(access_url)
    }
}
