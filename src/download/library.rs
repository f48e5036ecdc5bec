//! Maintenance of the download library on disk (`/cleanup`, `/status`).

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::utils::{bytes_to_mb, is_media_file};
use crate::download::platform::{DownloadDirs, Platform};

/// Platforms whose directories `/cleanup` and `/status` look at.
const MAINTAINED: [Platform; 2] = [Platform::X, Platform::YouTube];

/// Marker yt-dlp leaves in names of re-downloaded duplicates ("Title #2.mp4").
const DUPLICATE_MARKER: &str = " #";

fn media_files(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_media_file(p))
            .collect(),
        Err(e) => {
            log::debug!("Skipping {}: {}", dir.display(), e);
            Vec::new()
        }
    }
}

/// Deletes duplicate video files in the X and YouTube directories.
///
/// Returns how many files were removed. Files that cannot be deleted are
/// logged and skipped.
pub fn cleanup_duplicates(dirs: &DownloadDirs) -> usize {
    let mut removed = 0;
    for platform in MAINTAINED {
        for path in media_files(dirs.platform_dir(platform)) {
            let is_duplicate = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(DUPLICATE_MARKER));
            if !is_duplicate {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    log::info!("Removed duplicate file: {}", path.display());
                    removed += 1;
                }
                Err(e) => log::error!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
    removed
}

/// File counts for `/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryStats {
    pub x_files: usize,
    pub youtube_files: usize,
    pub total_bytes: u64,
}

impl LibraryStats {
    pub fn total_files(&self) -> usize {
        self.x_files + self.youtube_files
    }

    pub fn total_mb(&self) -> f64 {
        bytes_to_mb(self.total_bytes)
    }
}

pub fn library_stats(dirs: &DownloadDirs) -> LibraryStats {
    let x = media_files(dirs.platform_dir(Platform::X));
    let youtube = media_files(dirs.platform_dir(Platform::YouTube));
    let total_bytes = x
        .iter()
        .chain(youtube.iter())
        .filter_map(|p| fs::metadata(p).ok())
        .map(|m| m.len())
        .sum();

    LibraryStats {
        x_files: x.len(),
        youtube_files: youtube.len(),
        total_bytes,
    }
}
