/// Export format handling
///
/// This module provides the closed set of formats the design service can render,
/// plus the extension checks used by the downloader and the folder uploader.
use crate::constants::{COMPRESSIBLE_EXTENSIONS, UPLOADABLE_IMAGE_EXTENSIONS};
use crate::error::{ExportError, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Formats accepted by the image export endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Palette-friendly lossless raster
    Png,
    /// Lossy raster
    Jpg,
    /// Vector
    Svg,
    /// Document
    Pdf,
}

impl ExportFormat {
    /// Value sent as the `format` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
            ExportFormat::Svg => "svg",
            ExportFormat::Pdf => "pdf",
        }
    }

    /// Returns the file extension for this format
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn all_formats() -> Vec<ExportFormat> {
        vec![
            ExportFormat::Jpg,
            ExportFormat::Png,
            ExportFormat::Svg,
            ExportFormat::Pdf,
        ]
    }

    /// Get format names for error messages and CLI help text
    pub fn format_names() -> Vec<&'static str> {
        Self::all_formats().iter().map(|f| f.as_str()).collect()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" => Ok(ExportFormat::Jpg),
            "svg" => Ok(ExportFormat::Svg),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(ExportError::Validation(format!(
                "invalid image format: {}. Supported formats: {}",
                s,
                ExportFormat::format_names().join(", ")
            ))),
        }
    }
}

fn has_extension_in(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext_lower = ext.to_lowercase();
            extensions.contains(&ext_lower.as_str())
        })
        .unwrap_or(false)
}

/// Whether the downloader should run the compressor on this file
pub fn is_compression_supported(path: &Path) -> bool {
    has_extension_in(path, COMPRESSIBLE_EXTENSIONS)
}

/// Whether a folder upload should include this file
pub fn is_uploadable_image(path: &Path) -> bool {
    has_extension_in(path, UPLOADABLE_IMAGE_EXTENSIONS)
}
