//! Video file discovery
//!
//! Reads directory entries and file names only; file contents are never
//! opened.

use crate::config::ScanConfig;
use crate::error::{Result, TaggrrError};
use crate::grouping::ScannedFile;
use ahash::AHashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory scanner restricted to configured video extensions
#[derive(Debug, Clone)]
pub struct Scanner {
    extensions: AHashSet<String>,
    recursive: bool,
}

impl Scanner {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            extensions: config
                .video_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            recursive: config.recursive,
        }
    }

    /// Whether the file name carries a configured video extension
    pub fn is_video(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| self.extensions.contains(&ext.to_string_lossy().to_lowercase()))
            .unwrap_or(false)
    }

    /// Discover video files under `root`, ordered by path
    ///
    /// Unreadable entries below the root are logged and skipped; a missing or
    /// non-directory root is an error.
    pub fn scan(&self, root: &Path) -> Result<Vec<ScannedFile>> {
        if !root.is_dir() {
            return Err(TaggrrError::Scan {
                path: root.to_path_buf(),
                message: "Not a directory".to_string(),
            });
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();

        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            if entry.file_type().is_file() && self.is_video(entry.path()) {
                files.push(ScannedFile::from_path(entry.into_path()));
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!(root = %root.display(), files = files.len(), "scanned directory");
        Ok(files)
    }

    /// Scan several roots, keeping root order and dropping repeated paths
    pub fn scan_all(&self, roots: &[PathBuf]) -> Result<Vec<ScannedFile>> {
        let mut seen = AHashSet::new();
        let mut files = Vec::new();
        for root in roots {
            for file in self.scan(root)? {
                if seen.insert(file.path.clone()) {
                    files.push(file);
                }
            }
        }
        Ok(files)
    }
}
