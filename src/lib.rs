pub mod cli;
pub mod compression;
pub mod config;
pub mod constants;
pub mod download;
pub mod error;
pub mod figma;
pub mod formats;
pub mod logger;
pub mod pipeline;
pub mod storage;
pub mod upload;
pub mod utils;
pub mod validation;
pub mod walrus;

pub use compression::{encoder_quality, pngquant_quality_range, CompressionMethod, CompressionReport, ImageCompressor};
pub use config::{FigmaConfig, PipelineConfig, ProviderKind, SignedUploadConfig, StorageConfig, WalrusConfig};
pub use download::{AssetDownloader, CompressionOutcome, DownloadedFile, RetryPolicy};
pub use error::{ExportError, Result};
pub use figma::{ChildNodes, FigmaClient, ImageExportOptions, ImageUrls, NodeDescriptor};
pub use formats::ExportFormat;
pub use pipeline::{ExportPipeline, ExportRequest, FailedEntry, ImageAsset, PipelineReport, ReportEntry};
pub use storage::{SignedUploader, StorageProvider};
pub use upload::{BatchUploadSummary, UploadDispatcher, UploadFailure, UploadSuccess};
pub use walrus::WalrusUploader;
