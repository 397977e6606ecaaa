use crate::compression::{CompressionReport, ImageCompressor};
use crate::constants::{DEFAULT_BACKOFF_BASE, DEFAULT_MAX_RETRIES, DOWNLOAD_TIMEOUT};
use crate::error::{ExportError, Result};
use crate::formats::is_compression_supported;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Exponential backoff budget for a single download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BACKOFF_BASE,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Sleep before the next try after `attempt` (0-based) failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompressionOutcome {
    /// Format is not one the downloader compresses
    Skipped,
    Applied(CompressionReport),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub filename: String,
    /// Size as received, before compression
    pub original_size: u64,
    /// Size on disk after compression
    pub file_size: u64,
    pub compression: CompressionOutcome,
}

pub struct AssetDownloader {
    client: Client,
    retry: RetryPolicy,
    compressor: ImageCompressor,
}

impl AssetDownloader {
    pub fn new(retry: RetryPolicy, timeout: Duration, compressor: ImageCompressor) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExportError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            retry,
            compressor,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(
            RetryPolicy::default(),
            DOWNLOAD_TIMEOUT,
            ImageCompressor::default(),
        )
    }

    /// Fetch `url` into `dir/filename`, then compress it when the format allows.
    ///
    /// The final file only appears once the whole body has been written.
    pub async fn download(
        &self,
        url: &str,
        dir: &Path,
        filename: &str,
        quality: f64,
    ) -> Result<DownloadedFile> {
        let bytes = self.fetch_with_retry(url, filename).await?;

        let path = dir.join(filename);
        let part_path = dir.join(format!(".{}.part", filename));
        if let Err(e) = tokio::fs::write(&part_path, &bytes).await {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(e.into());
        }
        tokio::fs::rename(&part_path, &path).await?;

        let original_size = bytes.len() as u64;
        debug!(file = filename, size = original_size, "Saved download");

        let compression = if is_compression_supported(&path) {
            match self.compressor.compress(&path, quality).await {
                Ok(report) => {
                    debug!(
                        file = filename,
                        method = report.method.as_str(),
                        ratio = report.ratio,
                        "Compressed download"
                    );
                    CompressionOutcome::Applied(report)
                }
                Err(e) => {
                    warn!(file = filename, error = %e, "Compression failed, keeping original");
                    CompressionOutcome::Failed(e.to_string())
                }
            }
        } else {
            CompressionOutcome::Skipped
        };

        let file_size = tokio::fs::metadata(&path).await?.len();

        Ok(DownloadedFile {
            path,
            filename: filename.to_string(),
            original_size,
            file_size,
            compression,
        })
    }

    async fn fetch_with_retry(&self, url: &str, filename: &str) -> Result<Vec<u8>> {
        let attempts = self.retry.max_attempts();
        let mut last_error = String::new();

        for attempt in 0..attempts {
            debug!(file = filename, attempt = attempt + 1, "Attempting download");

            match self.fetch_once(url).await {
                Ok(bytes) => {
                    if attempt > 0 {
                        info!(file = filename, attempts = attempt + 1, "Download succeeded after retry");
                    }
                    return Ok(bytes);
                }
                Err(reason) => {
                    last_error = reason;
                    if attempt + 1 < attempts {
                        let delay = self.retry.delay_for(attempt);
                        warn!(
                            file = filename,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %last_error,
                            "Download failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        warn!(file = filename, attempts, error = %last_error, "Download retries exhausted");
        Err(ExportError::DownloadFailed {
            attempts,
            reason: last_error,
        })
    }

    async fn fetch_once(&self, url: &str) -> std::result::Result<Vec<u8>, String> {
        let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(format!("HTTP {}", status.as_u16()));
        }
        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(bytes.to_vec())
    }
}
