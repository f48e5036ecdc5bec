use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

use crate::core::config;

/// Characters that are stripped from titles before they become file names.
const FORBIDDEN_TITLE_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Unix-timestamp prefix added to directly fetched files (`1700000000_`).
static TIMESTAMP_PREFIX: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^\d{10}_").ok());

/// Bot token segment of Bot API URLs (`/bot123456:ABC-def/`).
static BOT_TOKEN_SEGMENT: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"bot\d+:[A-Za-z0-9_-]+").ok());

/// Display names longer than this are shortened.
const DISPLAY_NAME_MAX_CHARS: usize = 35;
/// Number of stem characters kept when shortening.
const DISPLAY_NAME_KEEP_CHARS: usize = 30;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Turns a media title into a file-name stem.
///
/// Removes `\/:*?"<>|`, trims whitespace and falls back to `fallback` (the
/// platform tag) when nothing is left.
///
/// # Example
///
/// ```
/// use grabbot::core::utils::sanitize_title;
///
/// assert_eq!(sanitize_title(Some("Test: Video?"), "youtube"), "Test Video");
/// assert_eq!(sanitize_title(Some(" ?? "), "bilibili"), "bilibili");
/// ```
pub fn sanitize_title(title: Option<&str>, fallback: &str) -> String {
    let cleaned: String = title
        .unwrap_or_default()
        .chars()
        .filter(|c| !FORBIDDEN_TITLE_CHARS.contains(c))
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Builds the name shown to the user for a stored file.
///
/// Strips a leading `NNNNNNNNNN_` timestamp token, then shortens names longer
/// than 35 characters to the first 30 characters of the stem + `...` + extension.
///
/// # Example
///
/// ```
/// use grabbot::core::utils::display_filename;
///
/// assert_eq!(
///     display_filename("1700000000_My Very Long Original Title.mp4"),
///     "My Very Long Original Title.mp4"
/// );
/// assert_eq!(display_filename("short.mp4"), "short.mp4");
/// ```
pub fn display_filename(filename: &str) -> String {
    let name = match TIMESTAMP_PREFIX.as_ref() {
        Some(re) => re.replace(filename, "").into_owned(),
        None => filename.to_string(),
    };

    if name.chars().count() <= DISPLAY_NAME_MAX_CHARS {
        return name;
    }

    let (stem, ext) = split_extension(&name);
    let head: String = stem.chars().take(DISPLAY_NAME_KEEP_CHARS).collect();
    format!("{}...{}", head, ext)
}

/// Splits `name.ext` into (`name`, `.ext`). Names without a dot (or starting
/// with one) have an empty extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Returns the last path component, or `default` when there is none.
pub fn basename_or(path: &str, default: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Whether the path carries one of the media extensions, in any case.
pub fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| config::download::MEDIA_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Masks bot tokens in text that may end up in logs or chat replies.
pub fn redact_bot_token(text: &str) -> String {
    match *BOT_TOKEN_SEGMENT {
        Some(ref re) => re.replace_all(text, "bot<redacted>").into_owned(),
        None => text.to_string(),
    }
}

/// Bytes → binary megabytes.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Rounds to two decimals, as the result summary shows sizes.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Formats an ETA as `1m05s` / `42s`.
pub fn format_eta(secs: u64) -> String {
    let (mins, secs) = (secs / 60, secs % 60);
    if mins > 0 {
        format!("{}m{:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
