//! Download orchestration: classification, format policy, progress bridging,
//! execution and post-transfer resolution.

pub mod engine;
pub mod error;
pub mod executor;
pub mod files;
pub mod format;
pub mod library;
pub mod options;
pub mod platform;
pub mod progress;
pub mod registry;
pub mod resolve;
pub mod result;
pub mod service;
pub mod ytdlp;

// Re-exports for convenience
pub use engine::{EngineError, EngineEvent, ExtractionEngine, ProbedMetadata};
pub use error::DownloadError;
pub use executor::{DownloadExecutor, ExecutorOutcome};
pub use platform::{DownloadDirs, Platform};
pub use result::{DownloadResult, FfprobeProber, MediaProber, Resolution};
pub use service::DownloadService;
pub use ytdlp::YtDlpEngine;
