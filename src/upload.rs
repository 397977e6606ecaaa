use crate::error::{ExportError, Result};
use crate::formats::is_uploadable_image;
use crate::storage::StorageProvider;
use futures::future::join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSuccess {
    pub file_name: String,
    pub file_path: PathBuf,
    pub url: String,
    pub file_size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadFailure {
    pub file_name: String,
    pub file_path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchUploadSummary {
    /// True when no file failed
    pub success: bool,
    pub total_files: usize,
    pub successful_count: usize,
    pub failed_count: usize,
    pub successful_uploads: Vec<UploadSuccess>,
    pub failed_uploads: Vec<UploadFailure>,
    /// Bytes uploaded successfully
    pub total_size: u64,
}

/// Fans uploads out to a single storage provider
pub struct UploadDispatcher {
    provider: StorageProvider,
}

impl UploadDispatcher {
    pub fn new(provider: StorageProvider) -> Self {
        Self { provider }
    }

    /// Upload every path concurrently; one failure never aborts the others.
    pub async fn upload_files(&self, paths: &[PathBuf]) -> BatchUploadSummary {
        let results = join_all(paths.iter().map(|path| self.upload_one(path))).await;

        let mut summary = BatchUploadSummary {
            total_files: paths.len(),
            ..BatchUploadSummary::default()
        };
        for (path, result) in paths.iter().zip(results) {
            let file_name = display_name(path);
            match result {
                Ok((url, file_size)) => {
                    summary.total_size += file_size;
                    summary.successful_uploads.push(UploadSuccess {
                        file_name,
                        file_path: path.clone(),
                        url,
                        file_size,
                    });
                }
                Err(e) => {
                    warn!(file = %file_name, error = %e, "Upload failed");
                    summary.failed_uploads.push(UploadFailure {
                        file_name,
                        file_path: path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        summary.successful_count = summary.successful_uploads.len();
        summary.failed_count = summary.failed_uploads.len();
        summary.success = summary.failed_count == 0;

        info!(
            provider = self.provider.name(),
            total = summary.total_files,
            succeeded = summary.successful_count,
            failed = summary.failed_count,
            "Upload batch finished"
        );
        summary
    }

    /// Upload every image found under `dir`, recursively.
    pub async fn upload_folder(&self, dir: &Path) -> Result<BatchUploadSummary> {
        let files = collect_uploadable_files(dir)?;
        if files.is_empty() {
            info!(folder = ?dir, "No uploadable images found");
            return Ok(BatchUploadSummary {
                success: true,
                ..BatchUploadSummary::default()
            });
        }
        info!(folder = ?dir, files = files.len(), "Uploading folder");
        Ok(self.upload_files(&files).await)
    }

    async fn upload_one(&self, path: &Path) -> Result<(String, u64)> {
        let url = self.provider.upload(path).await?;
        let file_size = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
        Ok((url, file_size))
    }
}

/// Walk `dir` for image files, skipping hidden entries. Results are sorted.
pub fn collect_uploadable_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ExportError::FolderNotFound(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && is_uploadable_image(path) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
