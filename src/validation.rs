use crate::constants::{MAX_COMPRESSION_QUALITY, MAX_SCALE, MIN_COMPRESSION_QUALITY, MIN_SCALE};
use crate::error::{ExportError, Result};
use std::path::Path;

/// Validate an export scale factor
pub fn validate_scale(scale: f64) -> Result<f64> {
    if !(MIN_SCALE..=MAX_SCALE).contains(&scale) {
        return Err(ExportError::Validation(format!(
            "invalid scale: {}. Scale must be between {} and {}",
            scale, MIN_SCALE, MAX_SCALE
        )));
    }
    Ok(scale)
}

/// Validate a compression quality value
pub fn validate_quality(quality: f64) -> Result<f64> {
    if !(MIN_COMPRESSION_QUALITY..=MAX_COMPRESSION_QUALITY).contains(&quality) {
        return Err(ExportError::Validation(format!(
            "invalid compression quality: {}. Quality must be between {} and {}",
            quality, MIN_COMPRESSION_QUALITY, MAX_COMPRESSION_QUALITY
        )));
    }
    Ok(quality)
}

/// Split a comma-separated node id list, dropping blanks
pub fn parse_node_ids(node_ids: &str) -> Result<Vec<String>> {
    let ids: Vec<String> = node_ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        return Err(ExportError::Validation(
            "at least one node id is required".to_string(),
        ));
    }
    Ok(ids)
}

pub fn validate_file_key(file_key: &str) -> Result<&str> {
    let trimmed = file_key.trim();
    if trimmed.is_empty() {
        return Err(ExportError::Validation("file key must not be empty".to_string()));
    }
    if trimmed.contains('/') {
        return Err(ExportError::Validation(format!(
            "file key must not contain '/': {}",
            trimmed
        )));
    }
    Ok(trimmed)
}

/// Validates that a regular file exists at the given path.
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(ExportError::FileNotFound(path.to_path_buf()));
    }
    Ok(())
}
