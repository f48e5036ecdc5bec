//! Torrent pass-through to a qBittorrent daemon.
//!
//! The bot never speaks BitTorrent itself: magnets, `.torrent` links and
//! uploaded `.torrent` documents are handed to qBittorrent, and the newest
//! entry of its list is reported back as a confirmation.

pub mod qbittorrent;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::error::AppResult;
use crate::core::utils::bytes_to_mb;

pub use qbittorrent::{QBittorrentClient, TorrentInfo};

/// Torrent daemon operations the bot needs.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Returns whether the daemon accepted the credentials.
    async fn login(&self) -> AppResult<bool>;

    /// Adds a magnet link or a `.torrent` URL.
    async fn enqueue(&self, url_or_magnet: &str) -> AppResult<()>;

    /// Adds an uploaded `.torrent` file.
    async fn enqueue_file(&self, name: &str, bytes: Vec<u8>) -> AppResult<()>;

    async fn list(&self) -> AppResult<Vec<TorrentInfo>>;

    /// Save path sent with every add, if configured.
    fn save_path(&self) -> Option<&str>;
}

/// Whether a text message should go to the torrent daemon.
pub fn is_torrent_link(text: &str) -> bool {
    let text = text.trim();
    let lower = text.to_lowercase();
    text.starts_with("magnet:") || lower.ends_with(".torrent") || lower.contains("torrent")
}

pub fn is_torrent_file(file_name: &str) -> bool {
    file_name.to_lowercase().ends_with(".torrent")
}

/// Confirmation shown after an add.
#[derive(Debug, Clone, PartialEq)]
pub struct TorrentSummary {
    /// Newest torrent in the daemon's list, if any
    pub newest: Option<NewestTorrent>,
    pub save_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewestTorrent {
    pub name: String,
    pub size_mb: f64,
    /// Percent
    pub progress: f64,
}

/// Entry with the largest `added_on`; ties keep the first.
fn newest(list: &[TorrentInfo]) -> Option<&TorrentInfo> {
    list.iter()
        .fold(None, |best: Option<&TorrentInfo>, t| match best {
            Some(b) if b.added_on >= t.added_on => Some(b),
            _ => Some(t),
        })
}

pub struct TorrentService {
    client: Arc<dyn TorrentClient>,
}

impl TorrentService {
    pub fn new(client: Arc<dyn TorrentClient>) -> Self {
        Self { client }
    }

    /// Logs in at startup. Torrent support stays off when this fails.
    pub async fn connect(client: Arc<dyn TorrentClient>) -> Option<Self> {
        match client.login().await {
            Ok(true) => {
                log::info!("qBittorrent connected");
                Some(Self::new(client))
            }
            Ok(false) => {
                log::warn!("qBittorrent login failed, torrent downloads disabled");
                None
            }
            Err(e) => {
                log::warn!("qBittorrent unreachable ({}), torrent downloads disabled", e);
                None
            }
        }
    }

    pub async fn enqueue_and_summarize(&self, url_or_magnet: &str) -> AppResult<TorrentSummary> {
        self.client.enqueue(url_or_magnet).await?;
        Ok(self.summarize().await)
    }

    pub async fn enqueue_file_and_summarize(&self, name: &str, bytes: Vec<u8>) -> AppResult<TorrentSummary> {
        self.client.enqueue_file(name, bytes).await?;
        Ok(self.summarize().await)
    }

    /// Best effort: a failed or empty list still confirms the add.
    async fn summarize(&self) -> TorrentSummary {
        let list = match self.client.list().await {
            Ok(list) => list,
            Err(e) => {
                log::warn!("Could not list torrents after add: {}", e);
                Vec::new()
            }
        };

        TorrentSummary {
            newest: newest(&list).map(|t| NewestTorrent {
                name: t.name.clone(),
                size_mb: bytes_to_mb(t.size),
                progress: t.progress * 100.0,
            }),
            save_path: self.client.save_path().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_torrent_link_detection() {
        assert!(is_torrent_link("magnet:?xt=urn:btih:abc"));
        assert!(is_torrent_link("https://tracker.example/file.TORRENT"));
        assert!(is_torrent_link("https://torrentsite.example/view/1"));
        assert!(!is_torrent_link("https://youtu.be/abc123"));
        assert!(is_torrent_file("Ubuntu.Torrent"));
        assert!(!is_torrent_file("notes.txt"));
    }

    #[test]
    fn test_newest_by_added_on() {
        let list = vec![
            TorrentInfo { name: "old".into(), added_on: 10, ..Default::default() },
            TorrentInfo { name: "new".into(), added_on: 30, ..Default::default() },
            TorrentInfo { name: "tie".into(), added_on: 30, ..Default::default() },
        ];
        assert_eq!(newest(&list).map(|t| t.name.as_str()), Some("new"));
        assert!(newest(&[]).is_none());
    }
}
