//! Direct file and photo downloads into `files/` and `images/`.
//!
//! Documents and photos sent to the bot are plain HTTP fetches: no extraction
//! engine, no progress. Every stored name gets a unix-timestamp prefix so
//! repeated uploads never collide.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::utils::{bytes_to_mb, redact_bot_token, round2};
use crate::download::platform::DownloadDirs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Document,
    Image,
}

impl FileKind {
    fn default_extension(&self) -> &'static str {
        match self {
            FileKind::Document => ".bin",
            FileKind::Image => ".jpg",
        }
    }

    fn is_image(&self) -> bool {
        *self == FileKind::Image
    }
}

/// A stored file.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedFile {
    pub path: PathBuf,
    /// Name on disk (`{ts}_{stem}{ext}`)
    pub file_name: String,
    /// Name as sent by the user
    pub original_name: String,
    pub size_mb: f64,
    pub is_image: bool,
}

/// Splits a file name into stem and extension (with the dot).
fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Picks the user-facing name: the given one, else the URL's last path segment,
/// else `{ts}{default ext}`.
pub fn original_name(url: &str, name: Option<&str>, kind: FileKind, timestamp: i64) -> String {
    if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| format!("{}{}", timestamp, kind.default_extension()))
}

/// Name stored on disk: `{ts}_{stem}{ext}`, extension defaulting per kind.
pub fn unique_name(original: &str, kind: FileKind, timestamp: i64) -> String {
    let (stem, ext) = split_name(original);
    let ext = if ext.is_empty() { kind.default_extension() } else { ext };
    format!("{}_{}{}", timestamp, stem, ext)
}

pub struct FileFetcher {
    client: reqwest::Client,
    files_dir: PathBuf,
    images_dir: PathBuf,
}

impl FileFetcher {
    pub fn new(dirs: &DownloadDirs, proxy: Option<&str>) -> AppResult<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config::download::USER_AGENT)
            .danger_accept_invalid_certs(true)
            .timeout(config::network::fetch_timeout());
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            files_dir: dirs.files_dir(),
            images_dir: dirs.images_dir(),
        })
    }

    fn target_dir(&self, kind: FileKind) -> &Path {
        match kind {
            FileKind::Document => &self.files_dir,
            FileKind::Image => &self.images_dir,
        }
    }

    /// Picks the stored name for `original` and its path, without touching the disk.
    pub fn reserve(&self, original: &str, kind: FileKind) -> ReservedFile {
        self.reserve_at(original, kind, chrono::Utc::now().timestamp())
    }

    fn reserve_at(&self, original: &str, kind: FileKind, timestamp: i64) -> ReservedFile {
        let file_name = unique_name(original, kind, timestamp);
        ReservedFile {
            path: self.target_dir(kind).join(&file_name),
            file_name,
            original_name: original.to_string(),
            kind,
        }
    }

    /// Downloads `url` into the directory for `kind`.
    ///
    /// Errors never carry the URL, which may embed credentials.
    pub async fn fetch(&self, url: &str, name: Option<&str>, kind: FileKind) -> AppResult<FetchedFile> {
        let timestamp = chrono::Utc::now().timestamp();
        let reserved = self.reserve_at(&original_name(url, name, kind, timestamp), kind, timestamp);

        match self.stream_to(url, &reserved.path).await {
            Ok(size) => {
                log::info!("Saved {} ({} bytes)", reserved.path.display(), size);
                Ok(reserved.into_fetched(size))
            }
            Err(e) => {
                log::error!("File download failed for {}: {}", redact_bot_token(url), e);
                reserved.discard().await;
                Err(e)
            }
        }
    }

    async fn stream_to(&self, url: &str, path: &Path) -> AppResult<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Http(e.without_url()))?;
        if !response.status().is_success() {
            return Err(AppError::HttpStatus(response.status()));
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AppError::Http(e.without_url()))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}

/// Destination picked for one incoming file.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub original_name: String,
    kind: FileKind,
}

impl ReservedFile {
    pub fn into_fetched(self, size: u64) -> FetchedFile {
        FetchedFile {
            path: self.path,
            file_name: self.file_name,
            original_name: self.original_name,
            size_mb: round2(bytes_to_mb(size)),
            is_image: self.kind.is_image(),
        }
    }

    /// Removes whatever was written so far.
    pub async fn discard(&self) {
        if !self.path.exists() {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            log::warn!("Could not remove partial file {}: {}", self.path.display(), e);
        }
    }
}
