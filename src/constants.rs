use std::time::Duration;

pub const DEFAULT_FIGMA_API_BASE_URL: &str = "https://api.figma.com/v1";
pub const FIGMA_TOKEN_HEADER: &str = "X-Figma-Token";
pub const FIGMA_API_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_FORMAT: &str = "png";
pub const DEFAULT_SCALE: f64 = 1.0;
pub const MIN_SCALE: f64 = 0.01;
pub const MAX_SCALE: f64 = 4.0;

pub const DEFAULT_COMPRESSION_QUALITY: f64 = 0.85;
pub const MIN_COMPRESSION_QUALITY: f64 = 0.0;
pub const MAX_COMPRESSION_QUALITY: f64 = 1.0;

// pngquant --quality range bounds
pub const PNGQUANT_MIN_FLOOR: u8 = 5;
pub const PNGQUANT_MIN_CEIL: u8 = 85;
pub const PNGQUANT_MAX_FLOOR: u8 = 20;
pub const PNGQUANT_MAX_CEIL: u8 = 95;
pub const PNGQUANT_MIN_SPAN: u8 = 10;
pub const PNGQUANT_QUALITY_TOO_LOW_EXIT: i32 = 99;
pub const PNGQUANT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PNGQUANT_BINARY: &str = "pngquant";

pub const MIN_ENCODER_QUALITY: u8 = 1;
pub const MAX_ENCODER_QUALITY: u8 = 100;

pub const DEFAULT_STAGING_DIR: &str = "temp-images";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

pub const FALLBACK_FILENAME_PREFIX: &str = "figma_export";
pub const FALLBACK_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
pub const UNSAFE_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Extensions the downloader hands to the compressor.
pub const COMPRESSIBLE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Extensions picked up when uploading a whole folder.
pub const UPLOADABLE_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp"];

pub const UPLOAD_FILE_FIELD: &str = "file";
pub const UPLOAD_CONTENT_TYPE: &str = "application/octet-stream";

pub const DEFAULT_STORAGE_PROVIDER: &str = "custom";
pub const DEFAULT_EPOCHS: u64 = 10;
pub const MAX_UPLOAD_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const WALRUS_BLOB_PATH: &str = "/v1/blobs/";
pub const DEFAULT_WALRUS_AGGREGATOR: &str = "https://aggregator.walrus-testnet.walrus.space";
pub const DEFAULT_WALRUS_PUBLISHER: &str = "https://publisher.walrus-testnet.walrus.space";

pub const PROGRESS_SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";
