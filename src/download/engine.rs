//! Extraction engine abstraction.
//!
//! The engine is the opaque component that knows how to fetch media. It
//! exposes a blocking two-phase protocol: `probe` (metadata only) and
//! `retrieve` (transfer, reporting progress through a callback on the calling
//! thread). `YtDlpEngine` in `download::ytdlp` is the production implementation.

use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use thiserror::Error;

use crate::download::options::RetrievalOptions;

/// Error raised by the engine. The message is what the engine reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EngineError(pub String);

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError(e.to_string())
    }
}

/// Accepts integer or float JSON numbers (yt-dlp emits both for byte counts).
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_u64().or_else(|| v.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))))
}

/// One format entry of a probe result.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct FormatInfo {
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Audio bitrate in kbit/s
    #[serde(default)]
    pub abr: Option<f64>,
    /// Total bitrate in kbit/s
    #[serde(default)]
    pub tbr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub filesize: Option<u64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub filesize_approx: Option<u64>,
    #[serde(default)]
    pub format_note: Option<String>,
}

/// `vcodec`/`acodec` are "none" (or missing) when the stream is absent.
fn codec_present(codec: Option<&str>) -> bool {
    matches!(codec, Some(c) if !c.is_empty() && c != "none")
}

impl FormatInfo {
    pub fn has_video(&self) -> bool {
        codec_present(self.vcodec.as_deref())
    }

    pub fn has_audio(&self) -> bool {
        codec_present(self.acodec.as_deref())
    }

    /// Audio bitrate, falling back to the total bitrate.
    pub fn bitrate(&self) -> Option<f64> {
        self.abr.or(self.tbr)
    }

    /// Exact size when known, otherwise yt-dlp's estimate. Zero counts as unknown.
    pub fn size_hint(&self) -> Option<u64> {
        self.filesize
            .filter(|s| *s > 0)
            .or(self.filesize_approx)
            .filter(|s| *s > 0)
    }
}

/// Metadata returned by `probe`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ProbedMetadata {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub formats: Vec<FormatInfo>,
}

/// Status carried by a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Downloading,
    Finished,
    #[serde(other)]
    Other,
}

/// A progress event as reported by the engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineEvent {
    pub status: EventStatus,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total_bytes: Option<u64>,
    #[serde(default)]
    pub total_bytes_estimate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub downloaded_bytes: Option<u64>,
    #[serde(default)]
    pub speed: Option<f64>,
}

impl EngineEvent {
    /// Known total, preferring the exact figure over the estimate. Zero counts as unknown.
    pub fn total(&self) -> Option<u64> {
        self.total_bytes
            .or_else(|| self.total_bytes_estimate.map(|e| e.max(0.0) as u64))
            .filter(|t| *t > 0)
    }

    pub fn downloading(filename: &str, downloaded: u64, total: Option<u64>, speed: Option<f64>) -> Self {
        Self {
            status: EventStatus::Downloading,
            filename: Some(filename.to_string()),
            total_bytes: total,
            total_bytes_estimate: None,
            downloaded_bytes: Some(downloaded),
            speed,
        }
    }

    pub fn finished(filename: &str) -> Self {
        Self {
            status: EventStatus::Finished,
            filename: Some(filename.to_string()),
            total_bytes: None,
            total_bytes_estimate: None,
            downloaded_bytes: None,
            speed: None,
        }
    }
}

/// Options for the metadata probe.
#[derive(Debug, Clone, Default)]
pub struct ProbeOptions {
    pub cookies_file: Option<PathBuf>,
    pub proxy: Option<String>,
}

/// The media extraction engine.
///
/// Both calls block; callers run them off the async scheduler.
pub trait ExtractionEngine: Send + Sync {
    /// Human-readable name (e.g. "yt-dlp")
    fn name(&self) -> &str;

    /// Fetches metadata without transferring media.
    fn probe(&self, url: &str, options: &ProbeOptions) -> Result<ProbedMetadata, EngineError>;

    /// Performs the transfer, calling `on_progress` synchronously for every event.
    fn retrieve(
        &self,
        url: &str,
        options: &RetrievalOptions,
        on_progress: &mut dyn FnMut(&EngineEvent),
    ) -> Result<(), EngineError>;

    /// Engine version string.
    fn version(&self) -> Result<String, EngineError>;
}
