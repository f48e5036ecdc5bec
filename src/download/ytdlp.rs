//! `yt-dlp` backed extraction engine, plus the `/formats` and `/version` helpers.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

use tokio::process::Command as TokioCommand;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::download::error::DownloadError;
use crate::download::engine::{EngineError, EngineEvent, ExtractionEngine, FormatInfo, ProbeOptions, ProbedMetadata};
use crate::download::options::RetrievalOptions;

/// Marker our progress template prefixes every JSON progress line with.
const PROGRESS_MARKER: &str = "GRABBOT ";

/// Number of stderr lines kept for error reporting.
const STDERR_TAIL_LINES: usize = 200;

/// How many formats `/formats` shows.
const LISTED_FORMATS: usize = 10;

/// Engine that drives the `yt-dlp` binary (`YTDL_BIN`).
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    bin: String,
}

impl Default for YtDlpEngine {
    fn default() -> Self {
        Self::new(config::YTDL_BIN.as_str())
    }
}

impl YtDlpEngine {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn bin(&self) -> &str {
        &self.bin
    }

    fn probe_args(url: &str, options: &ProbeOptions) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-J".into(),
            "--no-playlist".into(),
            "--no-warnings".into(),
            "--no-check-certificate".into(),
            "--socket-timeout".into(),
            config::download::SOCKET_TIMEOUT_SECS.to_string(),
        ];
        if let Some(ref cookies) = options.cookies_file {
            args.push("--cookies".into());
            args.push(cookies.to_string_lossy().into_owned());
        }
        if let Some(ref proxy) = options.proxy {
            args.push("--proxy".into());
            args.push(proxy.clone());
        }
        args.push(url.to_string());
        args
    }
}

/// Parses one stdout line of a retrieval. Lines without our marker are yt-dlp chatter.
pub fn parse_progress_line(line: &str) -> Option<EngineEvent> {
    let json = line.trim().strip_prefix(PROGRESS_MARKER)?;
    match serde_json::from_str::<EngineEvent>(json) {
        Ok(event) => Some(event),
        Err(e) => {
            log::debug!("Unparseable progress line ({}): {}", e, json);
            None
        }
    }
}

/// Picks the most useful line out of yt-dlp's stderr for the error message.
fn error_summary(stderr_lines: &VecDeque<String>) -> String {
    stderr_lines
        .iter()
        .rev()
        .find(|l| l.contains("ERROR"))
        .or_else(|| stderr_lines.iter().rev().find(|l| !l.trim().is_empty()))
        .map(|l| l.trim().to_string())
        .unwrap_or_else(|| "yt-dlp exited with an error".to_string())
}

impl ExtractionEngine for YtDlpEngine {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    fn probe(&self, url: &str, options: &ProbeOptions) -> Result<ProbedMetadata, EngineError> {
        let args = Self::probe_args(url, options);
        log::debug!("yt-dlp probe command: {} {}", self.bin, args.join(" "));

        let output = Command::new(&self.bin).args(&args).output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: VecDeque<String> = stderr.lines().map(str::to_string).collect();
            return Err(EngineError(error_summary(&lines)));
        }

        serde_json::from_slice::<ProbedMetadata>(&output.stdout)
            .map_err(|e| EngineError(format!("failed to parse metadata: {}", e)))
    }

    fn retrieve(
        &self,
        url: &str,
        options: &RetrievalOptions,
        on_progress: &mut dyn FnMut(&EngineEvent),
    ) -> Result<(), EngineError> {
        let mut args = options.to_ytdlp_args();
        args.extend([
            "--newline".to_string(),
            "--progress-template".to_string(),
            format!("download:{}%(progress)j", PROGRESS_MARKER),
            url.to_string(),
        ]);
        log::debug!("yt-dlp command for video download: {} {}", self.bin, args.join(" "));

        let mut child = Command::new(&self.bin)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError(format!("failed to spawn yt-dlp: {}", e)))?;

        let stderr_lines = Arc::new(Mutex::new(VecDeque::<String>::new()));
        let stderr_reader = child.stderr.take().map(|stream| {
            let lines = Arc::clone(&stderr_lines);
            thread::spawn(move || {
                for line in BufReader::new(stream).lines().map_while(Result::ok) {
                    log::debug!("yt-dlp stderr: {}", line);
                    if let Ok(mut tail) = lines.lock() {
                        tail.push_back(line);
                        if tail.len() > STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                    }
                }
            })
        });

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                match parse_progress_line(&line) {
                    Some(event) => on_progress(&event),
                    None => log::debug!("yt-dlp stdout: {}", line),
                }
            }
        }

        let status = child.wait()?;
        if let Some(handle) = stderr_reader {
            let _ = handle.join();
        }

        if status.success() {
            return Ok(());
        }
        let message = match stderr_lines.lock() {
            Ok(tail) => error_summary(&tail),
            Err(_) => format!("yt-dlp exited with {}", status),
        };
        Err(EngineError(message))
    }

    fn version(&self) -> Result<String, EngineError> {
        let output = Command::new(&self.bin).arg("--version").output()?;
        if !output.status.success() {
            return Err(EngineError(format!("yt-dlp --version exited with {}", output.status)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Title plus the first formats of a URL, for `/formats`.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatListing {
    pub title: String,
    pub formats: Vec<FormatInfo>,
}

/// Probes `url` and keeps the first ten formats.
pub async fn list_formats(engine: &YtDlpEngine, url: &str, proxy: Option<&str>) -> AppResult<FormatListing> {
    let options = ProbeOptions {
        cookies_file: None,
        proxy: proxy.map(str::to_string),
    };
    let args = YtDlpEngine::probe_args(url, &options);

    let output = tokio::time::timeout(
        config::download::probe_timeout(),
        TokioCommand::new(engine.bin()).args(&args).output(),
    )
    .await
    .map_err(|_| AppError::Download(DownloadError::ProbeFailure("yt-dlp probe timed out".into())))??;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: VecDeque<String> = stderr.lines().map(str::to_string).collect();
        return Err(DownloadError::ProbeFailure(error_summary(&lines)).into());
    }

    let metadata: ProbedMetadata = serde_json::from_slice(&output.stdout)?;
    Ok(FormatListing {
        title: metadata.title.unwrap_or_else(|| "Unknown".to_string()),
        formats: metadata.formats.into_iter().take(LISTED_FORMATS).collect(),
    })
}

/// `yt-dlp --version`, off the async scheduler.
pub async fn engine_version(engine: &YtDlpEngine) -> AppResult<String> {
    let engine = engine.clone();
    let version = tokio::task::spawn_blocking(move || engine.version())
        .await
        .map_err(|e| AppError::Config(format!("version task failed: {}", e)))?
        .map_err(|e| DownloadError::ProbeFailure(e.0))?;
    Ok(version)
}
