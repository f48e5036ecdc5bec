//! Handler types, dependencies and text routing

use std::sync::Arc;

use crate::download::files::FileFetcher;
use crate::download::platform::extract_embedded_link;
use crate::download::service::DownloadService;
use crate::download::ytdlp::YtDlpEngine;
use crate::torrent::{is_torrent_link, TorrentService};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub downloads: Arc<DownloadService>,
    pub files: Arc<FileFetcher>,
    /// `None` when torrent support is disabled
    pub torrents: Option<Arc<TorrentService>>,
    pub engine: YtDlpEngine,
    pub proxy: Option<String>,
}

impl HandlerDeps {
    pub fn new(
        downloads: Arc<DownloadService>,
        files: Arc<FileFetcher>,
        torrents: Option<Arc<TorrentService>>,
        engine: YtDlpEngine,
        proxy: Option<String>,
    ) -> Self {
        Self {
            downloads,
            files,
            torrents,
            engine,
            proxy,
        }
    }
}

/// What a plain text message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextRoute {
    Torrent(String),
    Download(String),
    Invalid,
}

/// Routes a text message: torrents first, then links, then links embedded
/// in share text.
pub fn route_text(text: &str) -> TextRoute {
    let text = text.trim();
    if is_torrent_link(text) {
        return TextRoute::Torrent(text.to_string());
    }
    if text.starts_with("http://") || text.starts_with("https://") {
        return TextRoute::Download(text.to_string());
    }
    match extract_embedded_link(text) {
        Some(url) => TextRoute::Download(url),
        None => TextRoute::Invalid,
    }
}
