//! Request flow for one URL: classify, register, execute, resolve, report.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::core::error::AppResult;
use crate::download::error::DownloadError;
use crate::download::executor::DownloadExecutor;
use crate::download::platform::DownloadDirs;
use crate::download::progress::{self, ProgressSnapshot};
use crate::download::registry::{DownloadTask, TaskRegistry};
use crate::download::resolve::resolve_output;
use crate::download::result::{aggregate, DownloadResult, MediaProber};
use crate::telegram::messages;
use crate::telegram::sink::{MessageHandle, NotificationSink};

pub struct DownloadService {
    dirs: DownloadDirs,
    registry: Arc<TaskRegistry>,
    executor: DownloadExecutor,
    prober: Arc<dyn MediaProber>,
}

impl DownloadService {
    pub fn new(dirs: DownloadDirs, executor: DownloadExecutor, prober: Arc<dyn MediaProber>) -> Self {
        Self {
            dirs,
            registry: Arc::new(TaskRegistry::new()),
            executor,
            prober,
        }
    }

    pub fn dirs(&self) -> &DownloadDirs {
        &self.dirs
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Downloads `url`, keeping one chat message updated with progress and
    /// finally with the outcome.
    ///
    /// Unsupported URLs are answered with a rejection and never become tasks.
    /// An error is returned only when the initial message cannot be sent.
    pub async fn handle_url(&self, sink: Arc<dyn NotificationSink>, url: &str) -> AppResult<DownloadResult> {
        let (platform, directory) = self.dirs.classify(url);
        if !platform.is_supported() {
            log::info!("Rejected unsupported URL: {}", url);
            notify(sink.send(messages::unsupported_platform()).await.map(|_| ()));
            return Ok(DownloadResult::failure(
                platform,
                DownloadError::ClassificationMiss(format!("unsupported URL: {}", url)),
            ));
        }

        let handle = sink.send(&messages::starting(platform)).await?;
        let task = DownloadTask::new(url, platform, directory, Arc::clone(&sink), handle);
        let task_id = task.task_id.clone();
        self.registry.register(task.clone());

        let (tx, rx) = progress::channel();
        let (outcome, relayed) = tokio::join!(
            self.executor.execute(&task, tx),
            relay_progress(sink.as_ref(), handle, rx)
        );
        log::debug!("Task {}: relayed {} progress updates", task_id, relayed);

        let resolved = if outcome.success {
            let directory = task.directory.clone();
            let probed_id = outcome.probed.as_ref().map(|p| p.id.clone());
            let snapshot = outcome.snapshot.clone();
            tokio::task::spawn_blocking(move || resolve_output(platform, &directory, probed_id.as_deref(), &snapshot))
                .await
                .unwrap_or_else(|e| {
                    log::error!("Task {}: file resolution failed: {}", task_id, e);
                    None
                })
        } else {
            None
        };

        let result = aggregate(&task, &outcome, resolved, self.prober.as_ref()).await;
        match result.error {
            Some(ref e) => log::warn!("Task {} failed: {} ({})", task_id, e, e.subcategory()),
            None => log::info!(
                "Task {} done: {} ({} MB, {})",
                task_id,
                result.display_filename,
                result.size_mb,
                result.resolution_text()
            ),
        }

        notify(sink.edit(handle, &messages::outcome(&result)).await);
        self.registry.release(&task_id);
        Ok(result)
    }
}

/// Edits the task message for every snapshot until the worker drops its sender.
async fn relay_progress(
    sink: &dyn NotificationSink,
    handle: MessageHandle,
    mut rx: mpsc::Receiver<ProgressSnapshot>,
) -> usize {
    let mut relayed = 0;
    while let Some(snapshot) = rx.recv().await {
        notify(sink.edit(handle, &messages::progress(&snapshot)).await);
        relayed += 1;
    }
    relayed
}

/// Chat transport failures never affect the task; they are logged.
fn notify(result: AppResult<()>) {
    if let Err(e) = result {
        let err = DownloadError::NotificationTransport(e.to_string());
        log::warn!("{} ({})", err, err.subcategory());
    }
}
