use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Access denied: check the access token permissions or file access{}", details(.0))]
    Auth(Option<String>),

    #[error("File not found: check that the file key is correct{}", details(.0))]
    NotFound(Option<String>),

    #[error("Rate limited: the API request quota was exceeded, retry later{}", details(.0))]
    RateLimited(Option<String>),

    #[error("API request failed with status {status}{}", details(.detail))]
    Remote { status: u16, detail: Option<String> },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network request error: {0}")]
    Transport(String),

    #[error("Missing dependency: {0}")]
    CompressionUnavailable(String),

    #[error("Image is already within quality range {min}-{max} and cannot be compressed further")]
    CompressionIneffective { min: u8, max: u8 },

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Upload configuration error: {0}")]
    UploadConfig(String),

    #[error("Upload server error: {0}")]
    UploadServer(String),

    #[error("Download failed after {attempts} attempts: {reason}")]
    DownloadFailed { attempts: u32, reason: String },

    #[error("The requested nodes have no children to export")]
    NoChildren,

    #[error("No image URLs were returned for the requested nodes")]
    NoImages,

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Folder not found: {0}")]
    FolderNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),
}

impl From<reqwest::Error> for ExportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExportError::Timeout(err.to_string())
        } else {
            ExportError::Transport(err.to_string())
        }
    }
}

fn details(detail: &Option<String>) -> String {
    match detail {
        Some(d) => format!(", details: {}", d),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
