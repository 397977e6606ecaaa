//! Typed configuration consumed by the export pipeline.
//!
//! Values are assembled by the caller (the CLI reads flags, `.env` and the
//! process environment) and passed in by value; nothing below the CLI reads
//! ambient process state.

use crate::constants::{
    DEFAULT_BACKOFF_BASE, DEFAULT_EPOCHS, DEFAULT_FIGMA_API_BASE_URL, DEFAULT_MAX_RETRIES,
    DEFAULT_PNGQUANT_BINARY, DEFAULT_STAGING_DIR, DEFAULT_STORAGE_PROVIDER,
    DEFAULT_WALRUS_AGGREGATOR, DEFAULT_WALRUS_PUBLISHER, DOWNLOAD_TIMEOUT, FIGMA_API_TIMEOUT,
    UPLOAD_TIMEOUT,
};
use crate::error::{ExportError, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Connection settings for the design service API
#[derive(Clone)]
pub struct FigmaConfig {
    pub access_token: String,
    pub api_base_url: String,
    pub timeout: Duration,
}

impl FigmaConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            api_base_url: DEFAULT_FIGMA_API_BASE_URL.to_string(),
            timeout: FIGMA_API_TIMEOUT,
        }
    }

    pub fn with_api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = api_base_url.into();
        self
    }
}

impl fmt::Debug for FigmaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FigmaConfig")
            .field("access_token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Which storage backend receives the exported files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Signed multipart upload to a custom endpoint
    Custom,
    /// Walrus decentralized storage
    Walrus,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Custom => "custom",
            ProviderKind::Walrus => "walrus",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "custom" => Ok(ProviderKind::Custom),
            "walrus" => Ok(ProviderKind::Walrus),
            other => Err(ExportError::UploadConfig(format!(
                "unsupported storage provider: {}",
                other
            ))),
        }
    }
}

/// Settings for the signed-upload provider. Missing keys are only an error
/// once this provider is actually constructed.
#[derive(Clone, Default)]
pub struct SignedUploadConfig {
    pub upload_url: Option<String>,
    pub secret_key: Option<String>,
}

impl fmt::Debug for SignedUploadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedUploadConfig")
            .field("upload_url", &self.upload_url)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct WalrusConfig {
    pub aggregator_url: String,
    pub publisher_url: String,
    pub epochs: Option<u64>,
}

impl Default for WalrusConfig {
    fn default() -> Self {
        Self {
            aggregator_url: DEFAULT_WALRUS_AGGREGATOR.to_string(),
            publisher_url: DEFAULT_WALRUS_PUBLISHER.to_string(),
            epochs: Some(DEFAULT_EPOCHS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub provider: String,
    pub custom: SignedUploadConfig,
    pub walrus: WalrusConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_STORAGE_PROVIDER.to_string(),
            custom: SignedUploadConfig::default(),
            walrus: WalrusConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Build the storage configuration from a key lookup.
    ///
    /// Keys: `STORAGE_PROVIDER`, `CUSTOM_UPLOAD_URL`, `CUSTOM_SECRET_KEY`,
    /// `WALRUS_AGGREGATOR_URL`, `WALRUS_PUBLISHER_URL`, `WALRUS_EPOCHS`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let walrus_defaults = WalrusConfig::default();

        let epochs = match non_empty("WALRUS_EPOCHS") {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                ExportError::Config(format!("WALRUS_EPOCHS must be an integer, got {}", raw))
            })?),
            None => walrus_defaults.epochs,
        };

        Ok(Self {
            provider: non_empty("STORAGE_PROVIDER")
                .unwrap_or_else(|| DEFAULT_STORAGE_PROVIDER.to_string()),
            custom: SignedUploadConfig {
                upload_url: non_empty("CUSTOM_UPLOAD_URL"),
                secret_key: non_empty("CUSTOM_SECRET_KEY"),
            },
            walrus: WalrusConfig {
                aggregator_url: non_empty("WALRUS_AGGREGATOR_URL")
                    .unwrap_or(walrus_defaults.aggregator_url),
                publisher_url: non_empty("WALRUS_PUBLISHER_URL")
                    .unwrap_or(walrus_defaults.publisher_url),
                epochs,
            },
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn provider_kind(&self) -> Result<ProviderKind> {
        ProviderKind::from_str(&self.provider)
    }
}

/// Local resources and retry budget for one pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub staging_dir: PathBuf,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub download_timeout: Duration,
    pub upload_timeout: Duration,
    pub pngquant_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            download_timeout: DOWNLOAD_TIMEOUT,
            upload_timeout: UPLOAD_TIMEOUT,
            pngquant_path: PathBuf::from(DEFAULT_PNGQUANT_BINARY),
        }
    }
}
