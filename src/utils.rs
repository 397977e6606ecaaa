use crate::constants::{PROGRESS_SPINNER_TEMPLATE, UNSAFE_FILENAME_CHARS, WALRUS_BLOB_PATH};
use indicatif::{ProgressBar, ProgressStyle};

/// Turn a design-node name into something usable as a file stem
///
/// # Arguments
/// * `name` - The raw node name
///
/// # Returns
/// * `Some(name)` with every character in `<>:"/\|?*` replaced by `_` and
///   surrounding whitespace trimmed, or `None` when nothing usable is left
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let replaced: String = name
        .trim()
        .chars()
        .map(|c| if UNSAFE_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Create a progress spinner with consistent styling
pub fn create_progress_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template(PROGRESS_SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// Build a Walrus blob access URL from aggregator URL and blob ID
pub fn build_walrus_access_url(aggregator_url: &str, blob_id: &str) -> String {
    format!(
        "{}{}{}",
        aggregator_url.trim_end_matches('/'),
        WALRUS_BLOB_PATH,
        blob_id
    )
}

/// Human-readable byte count using binary units, e.g. `1.5 KB`
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit + 1 < UNITS.len() {
        size /= 1024.0;
        unit += 1;
    }

    match unit {
        0 => format!("{} B", bytes),
        _ => format!("{:.1} {}", size, UNITS[unit]),
    }
}

/// Percent saved going from `before` to `after`; negative when the file grew.
pub fn calculate_compression_ratio(before: u64, after: u64) -> f64 {
    if before == 0 {
        return 0.0;
    }
    (before as f64 - after as f64) / before as f64 * 100.0
}
