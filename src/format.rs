//! Supported container extensions.
//!
//! The pipeline decodes whatever FFmpeg can open; this list is the set of
//! containers hosts can accept with confidence. The pipeline warns and
//! proceeds on anything else, while [`ensure_supported`] lets a host reject
//! early.

use std::path::Path;

use crate::error::SecondSightError;

/// Extensions accepted without a warning, including the leading dot.
pub const SUPPORTED_FORMATS: [&str; 7] = [".mp4", ".mov", ".avi", ".mkv", ".flv", ".wmv", ".m4v"];

/// `true` if the path's extension is one of [`SUPPORTED_FORMATS`],
/// compared case-insensitively.
///
/// # Example
///
/// ```
/// use secondsight::is_supported_video_format;
///
/// assert!(is_supported_video_format("clip.MP4"));
/// assert!(!is_supported_video_format("clip.webm"));
/// assert!(!is_supported_video_format("clip"));
/// ```
pub fn is_supported_video_format<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| is_supported_extension(extension))
}

/// `true` if `extension` (with or without a leading dot) is supported.
pub fn is_supported_extension(extension: &str) -> bool {
    let normalized = normalize_extension(extension);
    SUPPORTED_FORMATS.contains(&normalized.as_str())
}

/// Lowercase an extension and ensure it starts with a dot.
pub fn normalize_extension(extension: &str) -> String {
    let lowered = extension.trim().to_ascii_lowercase();
    if lowered.starts_with('.') {
        lowered
    } else {
        format!(".{lowered}")
    }
}

/// Reject paths whose extension is not supported.
///
/// # Errors
///
/// [`SecondSightError::UnsupportedFormat`] naming the extension, or
/// `"(none)"` when the path has no extension.
pub fn ensure_supported<P: AsRef<Path>>(path: P) -> Result<(), SecondSightError> {
    let path = path.as_ref();
    if is_supported_video_format(path) {
        return Ok(());
    }
    let extension = path
        .extension()
        .map(|extension| normalize_extension(&extension.to_string_lossy()))
        .unwrap_or_else(|| "(none)".to_string());
    Err(SecondSightError::UnsupportedFormat(extension))
}
