use crate::constants::{
    DEFAULT_PNGQUANT_BINARY, MAX_ENCODER_QUALITY, MIN_ENCODER_QUALITY, PNGQUANT_MAX_CEIL,
    PNGQUANT_MAX_FLOOR, PNGQUANT_MIN_CEIL, PNGQUANT_MIN_FLOOR, PNGQUANT_MIN_SPAN,
    PNGQUANT_QUALITY_TOO_LOW_EXIT, PNGQUANT_TIMEOUT,
};
use crate::error::{ExportError, Result};
use crate::utils::calculate_compression_ratio;
use crate::validation::validate_file_exists;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, warn};

/// Which strategy produced a compressed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    Pngquant,
    Jpeg,
    WebP,
    Resave,
    Passthrough,
}

impl CompressionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionMethod::Pngquant => "pngquant",
            CompressionMethod::Jpeg => "jpeg",
            CompressionMethod::WebP => "webp",
            CompressionMethod::Resave => "resave",
            CompressionMethod::Passthrough => "passthrough",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionReport {
    pub original_size: u64,
    pub compressed_size: u64,
    /// Percent saved; negative when the file grew
    pub ratio: f64,
    pub size_reduction: i64,
    pub method: CompressionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_range: Option<(u8, u8)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoder_quality: Option<u8>,
}

impl CompressionReport {
    fn new(original_size: u64, compressed_size: u64, method: CompressionMethod) -> Self {
        Self {
            original_size,
            compressed_size,
            ratio: calculate_compression_ratio(original_size, compressed_size),
            size_reduction: original_size as i64 - compressed_size as i64,
            method,
            quality_range: None,
            encoder_quality: None,
        }
    }
}

/// Map a 0.0-1.0 quality onto a pngquant `--quality min-max` range.
///
/// `min` lands in 5..=85, `max` in 20..=95, and `max` is at least `min + 10`.
pub fn pngquant_quality_range(quality: f64) -> (u8, u8) {
    let q = clamp_quality(quality);
    let min = ((5.0 + q * 80.0) as u8).clamp(PNGQUANT_MIN_FLOOR, PNGQUANT_MIN_CEIL);
    let mut max = ((20.0 + q * 75.0) as u8).clamp(PNGQUANT_MAX_FLOOR, PNGQUANT_MAX_CEIL);
    if max < min + PNGQUANT_MIN_SPAN {
        max = min + PNGQUANT_MIN_SPAN;
    }
    (min, max)
}

/// Map a 0.0-1.0 quality onto a lossy encoder quality in 1..=100.
pub fn encoder_quality(quality: f64) -> u8 {
    let q = clamp_quality(quality);
    ((1.0 + q * 99.0).round() as u8).clamp(MIN_ENCODER_QUALITY, MAX_ENCODER_QUALITY)
}

fn clamp_quality(quality: f64) -> f64 {
    if quality.is_nan() {
        return 0.0;
    }
    quality.clamp(0.0, 1.0)
}

/// Format-aware, in-place image compressor
#[derive(Debug, Clone)]
pub struct ImageCompressor {
    pngquant_path: PathBuf,
    pngquant_timeout: Duration,
}

impl Default for ImageCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_PNGQUANT_BINARY)
    }
}

impl ImageCompressor {
    pub fn new(pngquant_path: impl Into<PathBuf>) -> Self {
        Self {
            pngquant_path: pngquant_path.into(),
            pngquant_timeout: PNGQUANT_TIMEOUT,
        }
    }

    /// Compress `path` in place.
    ///
    /// PNG goes through pngquant only; JPEG and WebP are re-encoded; anything
    /// else is re-saved when decodable and passed through otherwise.
    pub async fn compress(&self, path: &Path, quality: f64) -> Result<CompressionReport> {
        validate_file_exists(path)?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if extension == "png" {
            return self.compress_png(path, quality).await;
        }

        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || compress_with_image_codec(&owned, quality))
            .await
            .map_err(|e| ExportError::Compression(format!("compression task failed: {}", e)))?
    }

    async fn compress_png(&self, path: &Path, quality: f64) -> Result<CompressionReport> {
        let original_size = fs::metadata(path)?.len();
        let (min, max) = pngquant_quality_range(quality);

        debug!(path = ?path, min, max, "Running pngquant");

        let mut command = Command::new(&self.pngquant_path);
        command
            .arg("--quality")
            .arg(format!("{}-{}", min, max))
            .arg("--force")
            .arg("--output")
            .arg(path)
            .arg(path)
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.pngquant_timeout, command.output()).await {
            Err(_) => {
                return Err(ExportError::Compression(format!(
                    "pngquant timed out after {:?}",
                    self.pngquant_timeout
                )))
            }
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(ExportError::CompressionUnavailable(format!(
                    "pngquant not found at {:?}; install it (e.g. `brew install pngquant` or `apt install pngquant`)",
                    self.pngquant_path
                )))
            }
            Ok(Err(e)) => {
                return Err(ExportError::Compression(format!(
                    "failed to run pngquant: {}",
                    e
                )))
            }
            Ok(Ok(output)) => output,
        };

        if output.status.success() {
            let compressed_size = fs::metadata(path)?.len();
            let mut report =
                CompressionReport::new(original_size, compressed_size, CompressionMethod::Pngquant);
            report.quality_range = Some((min, max));
            return Ok(report);
        }

        if output.status.code() == Some(PNGQUANT_QUALITY_TOO_LOW_EXIT) {
            return Err(ExportError::CompressionIneffective { min, max });
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() {
            format!("exit status {:?}", output.status.code())
        } else {
            stderr
        };
        warn!(path = ?path, detail = %detail, "pngquant failed");
        Err(ExportError::Compression(format!("pngquant failed: {}", detail)))
    }
}

/// Blocking re-encode for every non-PNG format.
pub fn compress_with_image_codec(path: &Path, quality: f64) -> Result<CompressionReport> {
    let original_size = fs::metadata(path)?.len();

    let format = match ImageFormat::from_path(path) {
        Ok(format) if format.reading_enabled() => format,
        _ => {
            debug!(path = ?path, "No re-encoder for this format, leaving file untouched");
            return Ok(CompressionReport::new(
                original_size,
                original_size,
                CompressionMethod::Passthrough,
            ));
        }
    };

    let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;

    let mut buffer = Vec::new();
    let (method, used_quality) = match format {
        ImageFormat::Jpeg => {
            let q = encoder_quality(quality);
            let rgb = img.to_rgb8();
            JpegEncoder::new_with_quality(&mut buffer, q).encode_image(&rgb)?;
            (CompressionMethod::Jpeg, Some(q))
        }
        ImageFormat::WebP => {
            // The pure-Rust WebP encoder is lossless; the quality is still recorded.
            let q = encoder_quality(quality);
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(WebPEncoder::new_lossless(&mut buffer))?;
            (CompressionMethod::WebP, Some(q))
        }
        other => {
            img.write_to(&mut std::io::Cursor::new(&mut buffer), other)?;
            (CompressionMethod::Resave, None)
        }
    };

    replace_file_contents(path, &buffer)?;

    let compressed_size = fs::metadata(path)?.len();
    let mut report = CompressionReport::new(original_size, compressed_size, method);
    report.encoder_quality = used_quality;
    Ok(report)
}

/// Swap in new bytes through a sibling temp file so the target is never half-written.
fn replace_file_contents(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.flush()?;
    temp.persist(path).map_err(|e| ExportError::Io(e.error))?;
    Ok(())
}

/// Writes an executable stand-in for pngquant that records its argv to
/// `args.txt` next to itself, runs `body`, then exits with `exit_code`.
#[cfg(all(test, unix))]
pub(crate) fn fake_pngquant(dir: &Path, body: &str, exit_code: i32) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = dir.join("fake-pngquant");
    let args_file = dir.join("args.txt");
    let contents = format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}'\n{}\nexit {}\n",
        args_file.display(),
        body,
        exit_code
    );
    fs::write(&script, contents).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
    script
}
