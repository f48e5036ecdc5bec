//! Registry of in-flight download tasks.
//!
//! Only the service inserts and removes entries; workers touch nothing but the
//! per-task snapshot they were handed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use uuid::Uuid;

use crate::download::platform::Platform;
use crate::download::progress::{lock_snapshot, new_shared_snapshot, ProgressSnapshot, SharedSnapshot};
use crate::telegram::sink::{MessageHandle, NotificationSink};

pub type TaskId = String;

pub fn new_task_id() -> TaskId {
    Uuid::new_v4().to_string()
}

/// One in-flight retrieval.
#[derive(Clone)]
pub struct DownloadTask {
    pub task_id: TaskId,
    pub url: String,
    pub platform: Platform,
    pub directory: PathBuf,
    pub sink: Arc<dyn NotificationSink>,
    pub message: MessageHandle,
    pub snapshot: SharedSnapshot,
    pub started_at: Instant,
}

impl DownloadTask {
    pub fn new(
        url: &str,
        platform: Platform,
        directory: PathBuf,
        sink: Arc<dyn NotificationSink>,
        message: MessageHandle,
    ) -> Self {
        Self {
            task_id: new_task_id(),
            url: url.to_string(),
            platform,
            directory,
            sink,
            message,
            snapshot: new_shared_snapshot(),
            started_at: Instant::now(),
        }
    }
}

impl std::fmt::Debug for DownloadTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadTask")
            .field("task_id", &self.task_id)
            .field("url", &self.url)
            .field("platform", &self.platform)
            .field("directory", &self.directory)
            .field("message", &self.message)
            .finish()
    }
}

#[derive(Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<TaskId, DownloadTask>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<TaskId, DownloadTask>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, task: DownloadTask) {
        log::debug!("Registering task {} ({})", task.task_id, task.platform);
        self.tasks().insert(task.task_id.clone(), task);
    }

    /// Current snapshot of a task, if it is still registered.
    pub fn snapshot(&self, task_id: &str) -> Option<ProgressSnapshot> {
        let shared = self.tasks().get(task_id).map(|t| Arc::clone(&t.snapshot))?;
        let snap = lock_snapshot(&shared).clone();
        Some(snap)
    }

    pub fn release(&self, task_id: &str) -> Option<DownloadTask> {
        let released = self.tasks().remove(task_id);
        if let Some(ref task) = released {
            log::debug!(
                "Released task {} after {:.1}s",
                task.task_id,
                task.started_at.elapsed().as_secs_f64()
            );
        }
        released
    }

    pub fn active_count(&self) -> usize {
        self.tasks().len()
    }

    pub fn active_ids(&self) -> Vec<TaskId> {
        self.tasks().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppResult;
    use async_trait::async_trait;

    struct NullSink;

    #[async_trait]
    impl NotificationSink for NullSink {
        async fn send(&self, _text: &str) -> AppResult<MessageHandle> {
            Ok(MessageHandle(1))
        }

        async fn edit(&self, _handle: MessageHandle, _text: &str) -> AppResult<()> {
            Ok(())
        }
    }

    fn task() -> DownloadTask {
        DownloadTask::new(
            "https://youtu.be/abc123",
            Platform::YouTube,
            PathBuf::from("/d/youtube"),
            Arc::new(NullSink),
            MessageHandle(1),
        )
    }

    #[test]
    fn test_register_snapshot_release() {
        let registry = TaskRegistry::new();
        let task = task();
        let id = task.task_id.clone();
        lock_snapshot(&task.snapshot).downloaded_bytes = 42;

        registry.register(task);
        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.active_ids(), vec![id.clone()]);
        assert_eq!(registry.snapshot(&id).map(|s| s.downloaded_bytes), Some(42));

        assert!(registry.release(&id).is_some());
        assert_eq!(registry.active_count(), 0);
        assert!(registry.snapshot(&id).is_none());
        assert!(registry.release(&id).is_none());
    }

    #[test]
    fn test_task_ids_are_unique() {
        let a = task();
        let b = task();
        assert_ne!(a.task_id, b.task_id);
        assert!(Uuid::parse_str(&a.task_id).is_ok());
    }
}
