use thiserror::Error;

use crate::download::error::DownloadError;

/// Centralized error types for the application
///
/// Everything the bot can fail with converts into this enum, so handlers can
/// log and surface a single type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Classified download failures (see `DownloadError`)
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP status code errors
    #[error("HTTP request failed with status: {0}")]
    HttpStatus(reqwest::StatusCode),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON decoding errors (yt-dlp output, qBittorrent responses)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// qBittorrent daemon errors
    #[error("Torrent error: {0}")]
    Torrent(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
