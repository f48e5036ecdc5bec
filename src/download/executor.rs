//! Runs one retrieval on a dedicated blocking worker.
//!
//! Each task gets its own `spawn_blocking` thread. The engine is probed first
//! (fail fast), then the transfer runs with a [`ProgressBridge`] as its progress
//! callback. When the engine returns without ever reporting `finished`, the
//! executor emits the terminal snapshot itself, so consumers always see exactly
//! one.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};

use crate::core::{config, proxy};
use crate::download::engine::{ExtractionEngine, ProbedMetadata};
use crate::download::error::DownloadError;
use crate::download::format;
use crate::download::options::{probe_options, RetrievalOptions};
use crate::download::platform::PlatformStrategy;
use crate::download::progress::{lock_snapshot, ProgressBridge, ProgressSnapshot, SharedSnapshot};
use crate::download::registry::DownloadTask;

/// What the worker reports back.
#[derive(Debug, Clone)]
pub struct ExecutorOutcome {
    pub success: bool,
    pub error: Option<DownloadError>,
    pub probed: Option<ProbedMetadata>,
    pub snapshot: ProgressSnapshot,
}

pub struct DownloadExecutor {
    engine: Arc<dyn ExtractionEngine>,
    limiter: Option<Arc<Semaphore>>,
    settle_delay: Duration,
    min_emit_interval: Duration,
    proxy: Option<String>,
}

impl DownloadExecutor {
    /// Executor with the configured concurrency bound, delays and proxy.
    pub fn new(engine: Arc<dyn ExtractionEngine>) -> Self {
        Self {
            engine,
            limiter: None,
            settle_delay: config::download::settle_delay(),
            min_emit_interval: config::progress::min_emit_interval(),
            proxy: proxy::active_proxy().map(str::to_string),
        }
        .with_max_concurrent(*config::MAX_CONCURRENT_DOWNLOADS)
    }

    /// Bounds concurrently running retrievals. 0 means unbounded.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.limiter = (max > 0).then(|| Arc::new(Semaphore::new(max)));
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_min_emit_interval(mut self, interval: Duration) -> Self {
        self.min_emit_interval = interval;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    /// Runs the task to completion. Snapshots go to `tx`; the terminal one is last.
    pub async fn execute(&self, task: &DownloadTask, tx: mpsc::Sender<ProgressSnapshot>) -> ExecutorOutcome {
        let _permit = match self.limiter {
            Some(ref limiter) => match Arc::clone(limiter).acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(e) => {
                    log::warn!("Download limiter closed ({}), running unbounded", e);
                    None
                }
            },
            None => None,
        };

        let engine = Arc::clone(&self.engine);
        let url = task.url.clone();
        let strategy = task.platform.strategy();
        let directory = task.directory.clone();
        let shared = Arc::clone(&task.snapshot);
        let proxy = self.proxy.clone();
        let interval = self.min_emit_interval;

        log::info!(
            "Task {}: starting {} download of {} into {}",
            task.task_id,
            task.platform,
            task.url,
            task.directory.display()
        );

        let joined = tokio::task::spawn_blocking(move || {
            run_worker(
                engine.as_ref(),
                &url,
                strategy,
                &directory,
                shared,
                tx,
                interval,
                proxy.as_deref(),
            )
        })
        .await;

        let (probed, result) = match joined {
            Ok(worker) => worker,
            Err(e) => {
                log::error!("Task {}: download worker failed: {}", task.task_id, e);
                (None, Err(DownloadError::TransferFailure(format!("download worker failed: {}", e))))
            }
        };

        if let Err(ref e) = result {
            log::error!("Task {}: {} ({})", task.task_id, e, e.subcategory());
        } else {
            // Let merges and renames land before the directory is inspected
            tokio::time::sleep(self.settle_delay).await;
        }

        ExecutorOutcome {
            success: result.is_ok(),
            error: result.err(),
            probed,
            snapshot: lock_snapshot(&task.snapshot).clone(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_worker(
    engine: &dyn ExtractionEngine,
    url: &str,
    strategy: &PlatformStrategy,
    directory: &Path,
    shared: SharedSnapshot,
    tx: mpsc::Sender<ProgressSnapshot>,
    min_interval: Duration,
    proxy: Option<&str>,
) -> (Option<ProbedMetadata>, Result<(), DownloadError>) {
    let probed = match engine.probe(url, &probe_options(strategy, proxy)) {
        Ok(probed) => probed,
        Err(e) => return (None, Err(DownloadError::ProbeFailure(e.0))),
    };
    log::info!(
        "Probed {} via {}: id={}, title={:?}, {} formats",
        url,
        engine.name(),
        probed.id,
        probed.title,
        probed.formats.len()
    );

    let plan = format::resolve(strategy, &probed, directory);
    log::info!("Format plan: {} -> {}", plan.selector, plan.output_template);
    let options = RetrievalOptions::build(strategy, &plan, proxy);

    let bridge = ProgressBridge::new(shared, tx, min_interval);
    if let Err(e) = engine.retrieve(url, &options, &mut |event| bridge.on_event(event)) {
        return (Some(probed), Err(DownloadError::TransferFailure(e.0)));
    }

    bridge.finish_if_pending();
    (Some(probed), Ok(()))
}
