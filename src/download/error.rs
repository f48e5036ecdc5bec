use std::fmt;

/// Classified failure of a download task.
///
/// Every variant carries the message that is surfaced to the user (or logged,
/// for the non-fatal ones).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadError {
    /// URL does not belong to a supported platform; rejected, never retried
    ClassificationMiss(String),
    /// Engine could not fetch metadata
    ProbeFailure(String),
    /// Engine retrieval failed
    TransferFailure(String),
    /// Transfer reported success but no artifact was found on disk
    FileNotResolved(String),
    /// Post-transfer media probe failed; non-fatal, resolution reported as unknown
    ProbeDegraded(String),
    /// Editing or sending a chat message failed; logged only
    NotificationTransport(String),
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for DownloadError {}

impl DownloadError {
    /// Returns subcategory for logs
    pub fn subcategory(&self) -> &'static str {
        match self {
            DownloadError::ClassificationMiss(_) => "classification_miss",
            DownloadError::ProbeFailure(_) => "probe_failure",
            DownloadError::TransferFailure(_) => "transfer_failure",
            DownloadError::FileNotResolved(_) => "file_not_resolved",
            DownloadError::ProbeDegraded(_) => "probe_degraded",
            DownloadError::NotificationTransport(_) => "notification_transport",
        }
    }

    /// Returns the inner message
    pub fn message(&self) -> &str {
        match self {
            DownloadError::ClassificationMiss(msg)
            | DownloadError::ProbeFailure(msg)
            | DownloadError::TransferFailure(msg)
            | DownloadError::FileNotResolved(msg)
            | DownloadError::ProbeDegraded(msg)
            | DownloadError::NotificationTransport(msg) => msg,
        }
    }
}
