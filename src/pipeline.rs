//! End-to-end export: resolve nodes, render, download, compress, upload.

use crate::compression::ImageCompressor;
use crate::config::{FigmaConfig, PipelineConfig, StorageConfig};
use crate::constants::{FALLBACK_FILENAME_PREFIX, FALLBACK_TIMESTAMP_FORMAT};
use crate::download::{AssetDownloader, CompressionOutcome, RetryPolicy};
use crate::error::{ExportError, Result};
use crate::figma::{FigmaClient, ImageExportOptions};
use crate::storage::StorageProvider;
use crate::upload::UploadDispatcher;
use crate::utils::{calculate_compression_ratio, format_file_size, sanitize_file_name};
use crate::validation::{parse_node_ids, validate_file_key, validate_quality};
use chrono::{DateTime, Local};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// A validated export request
#[derive(Debug, Clone)]
pub struct ExportRequest {
    file_key: String,
    node_ids: Vec<String>,
    options: ImageExportOptions,
    quality: f64,
    export_children: bool,
}

impl ExportRequest {
    pub fn new(
        file_key: &str,
        node_ids: &str,
        format: &str,
        scale: f64,
        quality: f64,
        export_children: bool,
    ) -> Result<Self> {
        Ok(Self {
            file_key: validate_file_key(file_key)?.to_string(),
            node_ids: parse_node_ids(node_ids)?,
            options: ImageExportOptions::new(format, scale)?,
            quality: validate_quality(quality)?,
            export_children,
        })
    }

    pub fn file_key(&self) -> &str {
        &self.file_key
    }

    pub fn node_ids(&self) -> &[String] {
        &self.node_ids
    }

    pub fn options(&self) -> &ImageExportOptions {
        &self.options
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn export_children(&self) -> bool {
        self.export_children
    }
}

/// A rendered node staged on local disk
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub node_id: String,
    pub source_url: String,
    pub path: PathBuf,
    pub file_size: u64,
    pub compression: CompressionOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntry {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub successful_uploads: Vec<ReportEntry>,
    pub failed_uploads: Vec<FailedEntry>,
}

/// Picks one unique filename per exported node within a run.
pub struct FilenamePlanner {
    extension: &'static str,
    timestamp: String,
    used: HashSet<String>,
}

impl FilenamePlanner {
    pub fn new(extension: &'static str, now: DateTime<Local>) -> Self {
        Self {
            extension,
            timestamp: now.format(FALLBACK_TIMESTAMP_FORMAT).to_string(),
            used: HashSet::new(),
        }
    }

    /// `index` is the node's position in the render response.
    pub fn plan(&mut self, index: usize, node_id: &str, name: Option<&str>) -> String {
        let candidate = name.map(|name| {
            let preferred = format!("{}.{}", name, self.extension);
            if self.used.contains(&preferred) {
                format!("{}_{}.{}", name, index + 1, self.extension)
            } else {
                preferred
            }
        });

        let filename = match candidate {
            Some(c) if !self.used.contains(&c) => c,
            _ => self.fallback(index, node_id),
        };
        self.used.insert(filename.clone());
        filename
    }

    fn fallback(&self, index: usize, node_id: &str) -> String {
        let id = sanitize_file_name(node_id).unwrap_or_else(|| "node".to_string());
        format!(
            "{}_{}_{}_{}.{}",
            FALLBACK_FILENAME_PREFIX,
            id,
            self.timestamp,
            index + 1,
            self.extension
        )
    }
}

struct PlannedDownload {
    node_id: String,
    url: String,
    filename: String,
}

pub struct ExportPipeline {
    figma: FigmaClient,
    downloader: AssetDownloader,
    dispatcher: UploadDispatcher,
    staging_dir: PathBuf,
    run_lock: Mutex<()>,
}

impl ExportPipeline {
    pub fn new(
        figma: FigmaClient,
        downloader: AssetDownloader,
        dispatcher: UploadDispatcher,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            figma,
            downloader,
            dispatcher,
            staging_dir: staging_dir.into(),
            run_lock: Mutex::new(()),
        }
    }

    pub fn from_config(
        figma: &FigmaConfig,
        provider: StorageProvider,
        config: &PipelineConfig,
    ) -> Result<Self> {
        let downloader = AssetDownloader::new(
            RetryPolicy::new(config.max_retries, config.backoff_base),
            config.download_timeout,
            ImageCompressor::new(&config.pngquant_path),
        )?;
        Ok(Self::new(
            FigmaClient::new(figma)?,
            downloader,
            UploadDispatcher::new(provider),
            &config.staging_dir,
        ))
    }

    /// Build the storage provider with the pipeline's upload timeout, then the pipeline.
    pub fn from_storage_config(
        figma: &FigmaConfig,
        storage: &StorageConfig,
        config: &PipelineConfig,
    ) -> Result<Self> {
        let provider = StorageProvider::from_config(storage, config.upload_timeout)?;
        Self::from_config(figma, provider, config)
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Run one export. Concurrent calls on the same pipeline queue up.
    pub async fn run(&self, request: &ExportRequest) -> Result<PipelineReport> {
        let _guard = self.run_lock.lock().await;
        self.reset_staging_dir().await?;

        let file_key = request.file_key();
        let (target_ids, names) = if request.export_children() {
            let children = self.figma.get_child_nodes(file_key, request.node_ids()).await?;
            if children.child_node_ids.is_empty() {
                return Err(ExportError::NoChildren);
            }
            let names: HashMap<String, String> = children
                .children
                .iter()
                .filter_map(|c| c.name.clone().map(|name| (c.id.clone(), name)))
                .collect();
            (children.child_node_ids, names)
        } else {
            let names = match self.figma.get_node_names(file_key, request.node_ids()).await {
                Ok(names) => names,
                Err(e) => {
                    warn!(error = %e, "Could not resolve node names, using generated filenames");
                    HashMap::new()
                }
            };
            (request.node_ids().to_vec(), names)
        };

        let urls = self
            .figma
            .get_image_urls(file_key, &target_ids, request.options())
            .await?;
        if urls.is_empty() {
            return Err(ExportError::NoImages);
        }
        if let Some(err) = &urls.err {
            warn!(error = %err, "Render response carried an error");
        }

        let mut report = PipelineReport::default();
        let mut planner = FilenamePlanner::new(request.options().format.extension(), Local::now());
        let mut planned = Vec::new();
        let returned: HashSet<String> = urls
            .images
            .iter()
            .map(|(id, _)| normalize_node_id(id))
            .collect();
        let missing: Vec<&String> = target_ids
            .iter()
            .filter(|id| !returned.contains(&normalize_node_id(id)))
            .collect();
        let rendered = urls.images.len();

        for (index, (node_id, url)) in urls.images.into_iter().enumerate() {
            let filename = planner.plan(index, &node_id, names.get(&node_id).map(String::as_str));
            match url {
                Some(url) => planned.push(PlannedDownload {
                    node_id,
                    url,
                    filename,
                }),
                None => report.failed_uploads.push(FailedEntry {
                    name: filename,
                    error: format!("No image URL returned for node {}", node_id),
                }),
            }
        }

        for (offset, node_id) in missing.into_iter().enumerate() {
            let name = names.get(node_id).map(String::as_str);
            let filename = planner.plan(rendered + offset, node_id, name);
            warn!(node = %node_id, "Node missing from render response");
            report.failed_uploads.push(FailedEntry {
                name: filename,
                error: format!("No image URL returned for node {}", node_id),
            });
        }

        info!(downloads = planned.len(), "Downloading rendered images");
        let downloads = join_all(planned.iter().map(|p| {
            self.downloader
                .download(&p.url, &self.staging_dir, &p.filename, request.quality())
        }))
        .await;

        let mut assets = Vec::with_capacity(planned.len());
        for (plan, result) in planned.into_iter().zip(downloads) {
            match result {
                Ok(file) => assets.push(ImageAsset {
                    node_id: plan.node_id,
                    source_url: plan.url,
                    path: file.path,
                    file_size: file.file_size,
                    compression: file.compression,
                }),
                Err(e) => report.failed_uploads.push(FailedEntry {
                    name: plan.filename,
                    error: format!("Download failed: {}", e),
                }),
            }
        }
        log_download_stats(&assets);

        let paths: Vec<PathBuf> = assets.iter().map(|a| a.path.clone()).collect();
        let summary = self.dispatcher.upload_files(&paths).await;

        report
            .successful_uploads
            .extend(summary.successful_uploads.into_iter().map(|s| ReportEntry {
                name: s.file_name,
                url: s.url,
            }));
        report
            .failed_uploads
            .extend(summary.failed_uploads.into_iter().map(|f| FailedEntry {
                name: f.file_name,
                error: f.error,
            }));

        info!(
            succeeded = report.successful_uploads.len(),
            failed = report.failed_uploads.len(),
            "Export finished"
        );
        Ok(report)
    }

    async fn reset_staging_dir(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.staging_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(&self.staging_dir).await?;
        Ok(())
    }
}

/// The API accepts `1-2` and answers with `1:2`.
fn normalize_node_id(id: &str) -> String {
    id.replace('-', ":")
}

fn log_download_stats(assets: &[ImageAsset]) {
    let mut original_total = 0u64;
    let mut compressed_total = 0u64;
    let mut compressed = 0usize;
    let mut compression_failures = 0usize;

    for asset in assets {
        match &asset.compression {
            CompressionOutcome::Applied(report) => {
                compressed += 1;
                original_total += report.original_size;
                compressed_total += report.compressed_size;
            }
            CompressionOutcome::Failed(_) => compression_failures += 1,
            CompressionOutcome::Skipped => {}
        }
    }

    info!(
        downloaded = assets.len(),
        compressed,
        compression_failures,
        before = %format_file_size(original_total),
        after = %format_file_size(compressed_total),
        saved_percent = %format!("{:.1}", calculate_compression_ratio(original_total, compressed_total)),
        "Download stage finished"
    );
}
