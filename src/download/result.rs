//! Final per-task record: executor outcome + resolved file + media probe.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::utils::{bytes_to_mb, display_filename, round2};
use crate::download::error::DownloadError;
use crate::download::executor::ExecutorOutcome;
use crate::download::platform::Platform;
use crate::download::registry::DownloadTask;
use crate::download::resolve::ResolvedFile;

/// Frame size of a video plus its quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn tier(&self) -> &'static str {
        match self.height {
            h if h >= 2160 => "2160p",
            h if h >= 1440 => "1440p",
            h if h >= 1080 => "1080p",
            h if h >= 720 => "720p",
            h if h >= 480 => "480p",
            h if h >= 360 => "360p",
            _ => "240p",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} ({})", self.width, self.height, self.tier())
    }
}

/// Reads the frame size of a local media file.
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn resolution(&self, path: &Path) -> AppResult<Resolution>;
}

/// `ffprobe` backed prober (`FFPROBE_BIN`).
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    bin: String,
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self {
            bin: config::FFPROBE_BIN.clone(),
        }
    }
}

/// Parses ffprobe's `WIDTHxHEIGHT` csv output.
fn parse_dimensions(output: &str) -> Option<Resolution> {
    let line = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (w, h) = line.split_once('x')?;
    let width = w.trim().parse().ok()?;
    let height = h.trim().trim_end_matches('x').parse().ok()?;
    Some(Resolution::new(width, height))
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn resolution(&self, path: &Path) -> AppResult<Resolution> {
        let output = tokio::process::Command::new(&self.bin)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "csv=s=x:p=0",
            ])
            .arg(path)
            .output()
            .await?;

        if !output.status.success() {
            return Err(DownloadError::ProbeDegraded(String::from_utf8_lossy(&output.stderr).trim().to_string()).into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_dimensions(&stdout)
            .ok_or_else(|| AppError::Download(DownloadError::ProbeDegraded(format!("no video stream in {}", path.display()))))
    }
}

/// Everything the user is told about a finished task.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadResult {
    pub success: bool,
    pub output_path: Option<PathBuf>,
    pub display_filename: String,
    pub size_bytes: u64,
    pub size_mb: f64,
    pub platform: Platform,
    pub resolution: Option<Resolution>,
    pub error: Option<DownloadError>,
}

impl DownloadResult {
    pub fn failure(platform: Platform, error: DownloadError) -> Self {
        Self {
            success: false,
            output_path: None,
            display_filename: String::new(),
            size_bytes: 0,
            size_mb: 0.0,
            platform,
            resolution: None,
            error: Some(error),
        }
    }

    /// `WxH (tier)` or "unknown".
    pub fn resolution_text(&self) -> String {
        self.resolution
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Combines the executor outcome and the resolved file into the final record.
pub async fn aggregate(
    task: &DownloadTask,
    outcome: &ExecutorOutcome,
    resolved: Option<ResolvedFile>,
    prober: &dyn MediaProber,
) -> DownloadResult {
    if !outcome.success {
        let error = outcome
            .error
            .clone()
            .unwrap_or_else(|| DownloadError::TransferFailure("download failed".to_string()));
        return DownloadResult::failure(task.platform, error);
    }

    let Some(file) = resolved else {
        log::error!("Task {}: transfer succeeded but no file found in {}", task.task_id, task.directory.display());
        return DownloadResult::failure(
            task.platform,
            DownloadError::FileNotResolved("downloaded file not found".to_string()),
        );
    };

    let resolution = match prober.resolution(&file.path).await {
        Ok(res) => Some(res),
        Err(e) => {
            let degraded = DownloadError::ProbeDegraded(e.to_string());
            log::warn!("Task {}: {} ({})", task.task_id, degraded, degraded.subcategory());
            None
        }
    };

    DownloadResult {
        success: true,
        display_filename: display_filename(&file.name),
        size_mb: round2(bytes_to_mb(file.size)),
        size_bytes: file.size,
        output_path: Some(file.path),
        platform: task.platform,
        resolution,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tiers() {
        let cases = [
            (3840, 2160, "2160p"),
            (2560, 1440, "1440p"),
            (1920, 1080, "1080p"),
            (1280, 720, "720p"),
            (854, 480, "480p"),
            (640, 360, "360p"),
            (426, 240, "240p"),
            (100, 100, "240p"),
        ];
        for (w, h, tier) in cases {
            assert_eq!(Resolution::new(w, h).tier(), tier, "{}x{}", w, h);
        }
        assert_eq!(Resolution::new(1920, 1080).to_string(), "1920x1080 (1080p)");
    }

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("1920x1080\n"), Some(Resolution::new(1920, 1080)));
        // Some builds print a trailing separator
        assert_eq!(parse_dimensions("720x1280x\n"), Some(Resolution::new(720, 1280)));
        assert_eq!(parse_dimensions(""), None);
        assert_eq!(parse_dimensions("N/AxN/A"), None);
    }

    #[test]
    fn test_failure_has_unknown_resolution() {
        let result = DownloadResult::failure(Platform::X, DownloadError::ProbeFailure("nope".into()));
        assert!(!result.success);
        assert_eq!(result.resolution_text(), "unknown");
    }
}
