//! Common test utilities
//!
//! Mock implementations of the engine, the chat sink, the media prober and
//! the torrent daemon, shared across integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use grabbot::core::error::{AppError, AppResult};
use grabbot::download::engine::{EngineError, EngineEvent, ExtractionEngine, ProbeOptions, ProbedMetadata};
use grabbot::download::options::RetrievalOptions;
use grabbot::download::{MediaProber, Resolution};
use grabbot::telegram::{MessageHandle, NotificationSink};
use grabbot::torrent::{TorrentClient, TorrentInfo};

/// Scripted extraction engine.
///
/// Events without a filename are reported with the output path, so a test can
/// script a transfer without knowing the final template in advance.
pub struct MockEngine {
    pub metadata: Result<ProbedMetadata, EngineError>,
    pub events: Vec<EngineEvent>,
    pub transfer_error: Option<EngineError>,
    /// Bytes written to the output path before returning, if any
    pub write_bytes: Option<usize>,
    pub probe_calls: AtomicUsize,
    pub retrieve_calls: AtomicUsize,
    pub templates: Mutex<Vec<String>>,
}

impl MockEngine {
    pub fn new(id: &str, title: Option<&str>) -> Self {
        Self {
            metadata: Ok(ProbedMetadata {
                id: id.to_string(),
                title: title.map(str::to_string),
                formats: Vec::new(),
            }),
            events: Vec::new(),
            transfer_error: None,
            write_bytes: None,
            probe_calls: AtomicUsize::new(0),
            retrieve_calls: AtomicUsize::new(0),
            templates: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_probe(message: &str) -> Self {
        Self {
            metadata: Err(EngineError(message.to_string())),
            ..Self::new("", None)
        }
    }

    pub fn with_events(mut self, events: Vec<EngineEvent>) -> Self {
        self.events = events;
        self
    }

    pub fn with_transfer_error(mut self, message: &str) -> Self {
        self.transfer_error = Some(EngineError(message.to_string()));
        self
    }

    pub fn writing(mut self, bytes: usize) -> Self {
        self.write_bytes = Some(bytes);
        self
    }

    fn output_path(&self, template: &str) -> PathBuf {
        let id = self.metadata.as_ref().map(|m| m.id.as_str()).unwrap_or_default();
        PathBuf::from(template.replace("%(id)s", id).replace("%(ext)s", "mp4"))
    }
}

/// Downloading event whose filename is filled in by the engine.
pub fn downloading(downloaded: u64, total: Option<u64>) -> EngineEvent {
    EngineEvent {
        filename: None,
        ..EngineEvent::downloading("", downloaded, total, Some(1024.0))
    }
}

/// Finished event whose filename is filled in by the engine.
pub fn finished() -> EngineEvent {
    EngineEvent {
        filename: None,
        ..EngineEvent::finished("")
    }
}

impl ExtractionEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    fn probe(&self, _url: &str, _options: &ProbeOptions) -> Result<ProbedMetadata, EngineError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        self.metadata.clone()
    }

    fn retrieve(
        &self,
        _url: &str,
        options: &RetrievalOptions,
        on_progress: &mut dyn FnMut(&EngineEvent),
    ) -> Result<(), EngineError> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        self.templates.lock().unwrap().push(options.output_template().to_string());

        let path = self.output_path(options.output_template());
        if let Some(bytes) = self.write_bytes {
            std::fs::write(&path, vec![0u8; bytes]).map_err(EngineError::from)?;
        }

        for event in &self.events {
            let mut event = event.clone();
            if event.filename.is_none() {
                event.filename = Some(path.to_string_lossy().to_string());
            }
            on_progress(&event);
        }

        match self.transfer_error {
            Some(ref e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn version(&self) -> Result<String, EngineError> {
        Ok("2024.01.01".to_string())
    }
}

/// Sink that records every send and edit.
#[derive(Default)]
pub struct RecordingSink {
    next_id: AtomicI32,
    pub sent: Mutex<Vec<String>>,
    pub edits: Mutex<Vec<(MessageHandle, String)>>,
    pub fail_edits: bool,
    pub fail_sends: bool,
}

impl RecordingSink {
    pub fn failing_edits() -> Self {
        Self {
            fail_edits: true,
            ..Default::default()
        }
    }

    pub fn failing_sends() -> Self {
        Self {
            fail_sends: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<String> {
        self.edits.lock().unwrap().iter().map(|(_, text)| text.clone()).collect()
    }

    pub fn last_edit(&self) -> Option<String> {
        self.edits().pop()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, text: &str) -> AppResult<MessageHandle> {
        if self.fail_sends {
            return Err(AppError::Config("chat unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(MessageHandle(self.next_id.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn edit(&self, handle: MessageHandle, text: &str) -> AppResult<()> {
        if self.fail_edits {
            return Err(AppError::Config("chat unavailable".to_string()));
        }
        self.edits.lock().unwrap().push((handle, text.to_string()));
        Ok(())
    }
}

/// Prober returning a fixed resolution, or failing when none is set.
pub struct MockProber(pub Option<Resolution>);

#[async_trait]
impl MediaProber for MockProber {
    async fn resolution(&self, _path: &std::path::Path) -> AppResult<Resolution> {
        self.0
            .ok_or_else(|| AppError::Config("ffprobe not available".to_string()))
    }
}

/// In-memory torrent daemon.
#[derive(Default)]
pub struct MockTorrentClient {
    pub accept_login: bool,
    pub fail_list: bool,
    pub listing: Vec<TorrentInfo>,
    pub added: Mutex<Vec<String>>,
    pub save_path: Option<String>,
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    async fn login(&self) -> AppResult<bool> {
        Ok(self.accept_login)
    }

    async fn enqueue(&self, url_or_magnet: &str) -> AppResult<()> {
        self.added.lock().unwrap().push(url_or_magnet.to_string());
        Ok(())
    }

    async fn enqueue_file(&self, name: &str, _bytes: Vec<u8>) -> AppResult<()> {
        self.added.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn list(&self) -> AppResult<Vec<TorrentInfo>> {
        if self.fail_list {
            return Err(AppError::Torrent("list unavailable".to_string()));
        }
        Ok(self.listing.clone())
    }

    fn save_path(&self) -> Option<&str> {
        self.save_path.as_deref()
    }
}
