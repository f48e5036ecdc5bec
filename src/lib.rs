//! Grabbot - Telegram bot that downloads videos from X, YouTube, Bilibili,
//! Douyin and a couple of adult platforms, plus plain files and torrents.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, proxy and small helpers
//! - `download`: platform classification, yt-dlp driving, progress bridging
//!   and result aggregation
//! - `telegram`: bot setup, handlers and message texts
//! - `torrent`: qBittorrent pass-through

pub mod core;
pub mod download;
pub mod telegram;
pub mod torrent;

// Re-export commonly used types for convenience
pub use core::{config, AppError, AppResult};
pub use download::{DownloadDirs, DownloadResult, DownloadService, Platform};
pub use telegram::{schema, HandlerDeps};
