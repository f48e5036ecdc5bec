//! Locates the downloaded artifact after a transfer.
//!
//! The engine's terminal path is used when it still exists. Merging and
//! conversion often rename the output, so otherwise the platform directory is
//! scanned for the most recently written media file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::core::config;
use crate::core::utils::{basename_or, is_media_file};
use crate::download::platform::Platform;
use crate::download::progress::ProgressSnapshot;

/// The artifact a task produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub path: PathBuf,
    pub size: u64,
    pub name: String,
}

impl ResolvedFile {
    fn from_path(path: PathBuf) -> Option<Self> {
        let size = fs::metadata(&path).ok()?.len();
        let name = basename_or(&path.to_string_lossy(), "video.mp4");
        Some(Self { path, size, name })
    }
}

/// A media file found by the directory scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Newest candidate modified within `window` of `now`, else the newest overall.
pub fn pick_freshest(candidates: &[Candidate], now: SystemTime, window: Duration) -> Option<&Candidate> {
    let is_fresh = |c: &&Candidate| {
        now.duration_since(c.modified)
            .map(|age| age <= window)
            // Modified "in the future" (clock skew) counts as fresh
            .unwrap_or(true)
    };

    candidates
        .iter()
        .filter(is_fresh)
        .max_by_key(|c| c.modified)
        .or_else(|| candidates.iter().max_by_key(|c| c.modified))
}

/// Lists media files in `directory`. For X only files named after `probed_id` qualify.
pub fn scan_candidates(platform: Platform, directory: &Path, probed_id: Option<&str>) -> Vec<Candidate> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot list {}: {}", directory.display(), e);
            return Vec::new();
        }
    };

    entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_media_file(path))
        .filter(|path| match (platform, probed_id) {
            (Platform::X, Some(id)) => path.file_stem().and_then(|s| s.to_str()) == Some(id),
            _ => true,
        })
        .filter_map(|path| {
            let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
            Some(Candidate { path, modified })
        })
        .collect()
}

/// Finds the file a finished task produced.
pub fn resolve_output(
    platform: Platform,
    directory: &Path,
    probed_id: Option<&str>,
    snapshot: &ProgressSnapshot,
) -> Option<ResolvedFile> {
    if let Some(path) = snapshot.terminal_output_path.as_ref().filter(|p| p.is_file()) {
        log::info!("Resolved output from engine report: {}", path.display());
        return ResolvedFile::from_path(path.clone());
    }

    let candidates = scan_candidates(platform, directory, probed_id);
    let picked = pick_freshest(&candidates, SystemTime::now(), config::download::freshness_window())?;
    log::info!(
        "Resolved output by directory scan: {} ({} candidates)",
        picked.path.display(),
        candidates.len()
    );
    ResolvedFile::from_path(picked.path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::File;

    const MIN: Duration = Duration::from_secs(60);
    const HOUR: Duration = Duration::from_secs(3600);

    fn candidate(name: &str, now: SystemTime, age: Duration) -> Candidate {
        Candidate {
            path: PathBuf::from(name),
            modified: now - age,
        }
    }

    fn touch(dir: &Path, name: &str, age: Duration) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
        path
    }

    #[test]
    fn test_pick_prefers_fresh_file() {
        let now = SystemTime::now();
        let candidates = vec![
            candidate("2h.mp4", now, 2 * HOUR),
            candidate("10m.mp4", now, 10 * MIN),
            candidate("3h.mp4", now, 3 * HOUR),
        ];
        let picked = pick_freshest(&candidates, now, HOUR).unwrap();
        assert_eq!(picked.path, PathBuf::from("10m.mp4"));
    }

    #[test]
    fn test_pick_falls_back_to_least_old() {
        let now = SystemTime::now();
        let candidates = vec![candidate("3h.mp4", now, 3 * HOUR), candidate("2h.mp4", now, 2 * HOUR)];
        let picked = pick_freshest(&candidates, now, HOUR).unwrap();
        assert_eq!(picked.path, PathBuf::from("2h.mp4"));
        assert!(pick_freshest(&[], now, HOUR).is_none());
    }

    #[test]
    fn test_terminal_path_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let reported = touch(tmp.path(), "Reported.mp4", 3 * HOUR);
        touch(tmp.path(), "Newer.mp4", MIN);

        let snapshot = ProgressSnapshot {
            terminal_output_path: Some(reported.clone()),
            ..Default::default()
        };
        let resolved = resolve_output(Platform::YouTube, tmp.path(), None, &snapshot).unwrap();
        assert_eq!(resolved.path, reported);
        assert_eq!(resolved.name, "Reported.mp4");
    }

    #[test]
    fn test_stale_terminal_path_falls_back_to_scan() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "old.webm", 2 * HOUR);
        let fresh = touch(tmp.path(), "Merged.mp4", 10 * MIN);
        touch(tmp.path(), "notes.txt", Duration::ZERO);

        let snapshot = ProgressSnapshot {
            terminal_output_path: Some(tmp.path().join("Merged.f137.mp4")),
            ..Default::default()
        };
        let resolved = resolve_output(Platform::YouTube, tmp.path(), None, &snapshot).unwrap();
        assert_eq!(resolved.path, fresh);
    }

    #[test]
    fn test_x_scan_only_matches_probed_id() {
        let tmp = tempfile::tempdir().unwrap();
        let own = touch(tmp.path(), "1790000000000000001.mp4", HOUR + MIN);
        touch(tmp.path(), "1790000000000000002.mp4", MIN);

        let resolved = resolve_output(
            Platform::X,
            tmp.path(),
            Some("1790000000000000001"),
            &ProgressSnapshot::default(),
        )
        .unwrap();
        assert_eq!(resolved.path, own);
    }

    #[test]
    fn test_nothing_to_resolve() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(resolve_output(Platform::Douyin, tmp.path(), None, &ProgressSnapshot::default()).is_none());
        assert!(resolve_output(Platform::Douyin, &tmp.path().join("missing"), None, &ProgressSnapshot::default()).is_none());
    }
}
