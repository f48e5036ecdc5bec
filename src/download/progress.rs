//! Progress bridge between the blocking retrieval worker and the async side.
//!
//! The worker calls [`ProgressBridge::on_event`] synchronously for every engine
//! event. The bridge folds the event into the task's shared snapshot and, rate
//! limited, pushes a copy into a bounded channel that the service drains into
//! chat edits. The terminal snapshot is always delivered and is always last.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::core::config;
use crate::core::utils::{basename_or, format_eta};
use crate::download::engine::{EngineEvent, EventStatus};

/// Name shown until the engine reports one.
pub const DEFAULT_FILENAME: &str = "video.mp4";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotStatus {
    Downloading,
    Finished,
}

/// Point-in-time view of one task's transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub display_filename: String,
    pub total_bytes: Option<u64>,
    pub downloaded_bytes: u64,
    pub speed_bytes_per_sec: Option<f64>,
    pub status: SnapshotStatus,
    /// Percent in `[0, 100]`, never decreasing
    pub completion_fraction: f64,
    pub terminal_output_path: Option<PathBuf>,
    pub last_emit: Option<Instant>,
}

impl Default for ProgressSnapshot {
    fn default() -> Self {
        Self {
            display_filename: DEFAULT_FILENAME.to_string(),
            total_bytes: None,
            downloaded_bytes: 0,
            speed_bytes_per_sec: None,
            status: SnapshotStatus::Downloading,
            completion_fraction: 0.0,
            terminal_output_path: None,
            last_emit: None,
        }
    }
}

impl ProgressSnapshot {
    pub fn is_finished(&self) -> bool {
        self.status == SnapshotStatus::Finished
    }

    /// Remaining-time text: `1m05s`, "calculating" (speed but no total) or "unknown".
    pub fn eta_text(&self) -> String {
        match (self.speed_bytes_per_sec.filter(|s| *s > 0.0), self.total_bytes) {
            (Some(speed), Some(total)) if self.downloaded_bytes < total => {
                let remaining = (total - self.downloaded_bytes) as f64;
                format_eta((remaining / speed) as u64)
            }
            (Some(_), _) => "calculating".to_string(),
            (None, _) => "unknown".to_string(),
        }
    }

    /// Marks the snapshot finished. Returns false when it already was.
    fn mark_finished(&mut self, output_path: Option<PathBuf>) -> bool {
        if self.is_finished() {
            return false;
        }
        self.status = SnapshotStatus::Finished;
        self.completion_fraction = 100.0;
        if output_path.is_some() {
            self.terminal_output_path = output_path;
        }
        true
    }
}

/// Snapshot shared between a task's worker and the registry.
pub type SharedSnapshot = Arc<Mutex<ProgressSnapshot>>;

pub fn new_shared_snapshot() -> SharedSnapshot {
    Arc::new(Mutex::new(ProgressSnapshot::default()))
}

/// Creates the bounded per-task snapshot channel.
pub fn channel() -> (mpsc::Sender<ProgressSnapshot>, mpsc::Receiver<ProgressSnapshot>) {
    mpsc::channel(config::progress::CHANNEL_CAPACITY)
}

/// Locks a snapshot, recovering it when a worker panicked while holding the lock.
pub fn lock_snapshot(shared: &SharedSnapshot) -> MutexGuard<'_, ProgressSnapshot> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Worker-side half of the bridge. Lives on the blocking thread.
pub struct ProgressBridge {
    shared: SharedSnapshot,
    tx: mpsc::Sender<ProgressSnapshot>,
    min_interval: Duration,
}

impl ProgressBridge {
    pub fn new(shared: SharedSnapshot, tx: mpsc::Sender<ProgressSnapshot>, min_interval: Duration) -> Self {
        Self {
            shared,
            tx,
            min_interval,
        }
    }

    /// Folds one engine event into the snapshot and relays it if due.
    ///
    /// Must be called from a blocking thread: terminal snapshots use a
    /// blocking send.
    pub fn on_event(&self, event: &EngineEvent) {
        match event.status {
            EventStatus::Downloading => self.on_downloading(event),
            EventStatus::Finished => {
                let path = event.filename.as_ref().map(PathBuf::from);
                self.finish(path, event.filename.as_deref());
            }
            EventStatus::Other => log::debug!("Ignoring engine event {:?}", event),
        }
    }

    /// Emits the terminal snapshot unless the engine already did.
    ///
    /// Returns whether a synthetic terminal emission happened.
    pub fn finish_if_pending(&self) -> bool {
        let emitted = self.finish(None, None);
        if emitted {
            log::info!("Engine reported no finished event, emitted terminal progress");
        }
        emitted
    }

    fn on_downloading(&self, event: &EngineEvent) {
        let now = Instant::now();
        let to_send = {
            let mut snap = lock_snapshot(&self.shared);
            if snap.is_finished() {
                return;
            }

            let name = event.filename.as_deref().unwrap_or_default();
            snap.display_filename = basename_or(name, DEFAULT_FILENAME);
            snap.downloaded_bytes = event.downloaded_bytes.unwrap_or(0);
            snap.speed_bytes_per_sec = event.speed;
            snap.total_bytes = event.total();

            let fraction = match snap.total_bytes {
                Some(total) => (snap.downloaded_bytes as f64 / total as f64 * 100.0).clamp(0.0, 100.0),
                None => 0.0,
            };
            if fraction > snap.completion_fraction {
                snap.completion_fraction = fraction;
            }

            let due = snap
                .last_emit
                .map_or(true, |last| now.duration_since(last) >= self.min_interval);
            if !due {
                return;
            }
            snap.last_emit = Some(now);
            snap.clone()
        };

        // Superseded by the next update if the consumer is behind
        if let Err(e) = self.tx.try_send(to_send) {
            log::debug!("Dropped progress update: {}", e);
        }
    }

    fn finish(&self, output_path: Option<PathBuf>, filename: Option<&str>) -> bool {
        let to_send = {
            let mut snap = lock_snapshot(&self.shared);
            if !snap.mark_finished(output_path) {
                return false;
            }
            if let Some(name) = filename {
                snap.display_filename = basename_or(name, DEFAULT_FILENAME);
            }
            snap.last_emit = Some(Instant::now());
            snap.clone()
        };

        if self.tx.blocking_send(to_send).is_err() {
            log::warn!("Progress receiver closed before the terminal update");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bridge(interval: Duration) -> (ProgressBridge, SharedSnapshot, mpsc::Receiver<ProgressSnapshot>) {
        let shared = new_shared_snapshot();
        let (tx, rx) = channel();
        (ProgressBridge::new(Arc::clone(&shared), tx, interval), shared, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<ProgressSnapshot>) -> Vec<ProgressSnapshot> {
        let mut out = Vec::new();
        while let Ok(s) = rx.try_recv() {
            out.push(s);
        }
        out
    }

    #[test]
    fn test_burst_is_rate_limited_but_finish_is_relayed() {
        let (bridge, _, mut rx) = bridge(Duration::from_secs(1));
        for i in 1..=10 {
            bridge.on_event(&EngineEvent::downloading("/d/youtube/a.mp4", i * 100, Some(1000), Some(50.0)));
        }
        bridge.on_event(&EngineEvent::finished("/d/youtube/a.mp4"));

        let sent = drain(&mut rx);
        let downloading = sent.iter().filter(|s| !s.is_finished()).count();
        assert!(downloading <= 1, "{} downloading snapshots relayed", downloading);
        assert_eq!(sent.last().map(|s| s.status), Some(SnapshotStatus::Finished));
        assert_eq!(sent.last().map(|s| s.completion_fraction), Some(100.0));
    }

    #[test]
    fn test_updates_spaced_by_interval_are_relayed() {
        let (bridge, _, mut rx) = bridge(Duration::ZERO);
        bridge.on_event(&EngineEvent::downloading("a.mp4", 100, Some(1000), None));
        bridge.on_event(&EngineEvent::downloading("a.mp4", 200, Some(1000), None));
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[test]
    fn test_fraction_never_decreases() {
        let (bridge, shared, mut rx) = bridge(Duration::ZERO);
        bridge.on_event(&EngineEvent::downloading("a.mp4", 600, Some(1000), None));
        // A new fragment restarts the byte counter
        bridge.on_event(&EngineEvent::downloading("a.mp4", 100, Some(1000), None));
        bridge.on_event(&EngineEvent::downloading("a.mp4", 50, None, None));

        let fractions: Vec<f64> = drain(&mut rx).iter().map(|s| s.completion_fraction).collect();
        assert_eq!(fractions, vec![60.0, 60.0, 60.0]);
        assert_eq!(lock_snapshot(&shared).total_bytes, None);
    }

    #[test]
    fn test_finish_if_pending_emits_exactly_once() {
        let (bridge, shared, mut rx) = bridge(Duration::from_secs(1));
        assert!(bridge.finish_if_pending());
        assert!(!bridge.finish_if_pending());

        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].is_finished());
        assert_eq!(sent[0].display_filename, DEFAULT_FILENAME);
        assert!(lock_snapshot(&shared).is_finished());
    }

    #[test]
    fn test_events_after_finish_are_ignored() {
        let (bridge, shared, mut rx) = bridge(Duration::ZERO);
        bridge.on_event(&EngineEvent::finished("/d/x/123.mp4"));
        bridge.on_event(&EngineEvent::downloading("/d/x/other.mp4", 1, Some(10), None));
        assert!(!bridge.finish_if_pending());

        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 1);
        let snap = lock_snapshot(&shared);
        assert_eq!(snap.terminal_output_path, Some(PathBuf::from("/d/x/123.mp4")));
        assert_eq!(snap.display_filename, "123.mp4");
    }

    #[test]
    fn test_eta_text() {
        let mut snap = ProgressSnapshot {
            total_bytes: Some(1000),
            downloaded_bytes: 400,
            speed_bytes_per_sec: Some(10.0),
            ..Default::default()
        };
        assert_eq!(snap.eta_text(), "1m00s");
        snap.total_bytes = None;
        assert_eq!(snap.eta_text(), "calculating");
        snap.speed_bytes_per_sec = None;
        assert_eq!(snap.eta_text(), "unknown");
    }
}
