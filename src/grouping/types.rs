// Shared types for file grouping
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::extraction::{ExtractionResult, SourceHint};

/// Raw file record produced by a directory scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub folder_name: String,
    pub file_name: String,
}

impl ScannedFile {
    /// Build a record from a path, deriving folder and file names
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let folder_name = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            path,
            folder_name,
            file_name,
        }
    }
}

/// Part marker attached to a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartInfo {
    pub part_number: u32,
    /// Label of the matched input pattern ("CD2"), kept for diagnostics
    pub pattern_label: String,
    pub confidence: f32,
}

/// A discovered video file after part and source detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFile {
    pub path: PathBuf,
    pub folder_name: String,
    pub file_name: String,
    pub part_info: Option<PartInfo>,
    pub source_hints: Vec<SourceHint>,
    /// Base name with extension and part marker removed
    pub stripped_name: String,
}

impl VideoFile {
    /// File name without extension
    pub fn stem(&self) -> &str {
        split_extension(&self.file_name).0
    }

    /// Lowercased extension without the dot
    pub fn extension(&self) -> Option<String> {
        split_extension(&self.file_name).1.map(|e| e.to_lowercase())
    }

    pub fn part_number(&self) -> Option<u32> {
        self.part_info.as_ref().map(|p| p.part_number)
    }

    /// Directory holding the file, used to keep groups within one folder
    pub fn folder_key(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(&self.folder_name))
    }
}

/// Split "name.ext" into ("name", Some("ext")); dotfiles keep their name
pub fn split_extension(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < file_name.len() => {
            (&file_name[..idx], Some(&file_name[idx + 1..]))
        }
        _ => (file_name, None),
    }
}

/// One logical video item: a single file or the ordered parts of one title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoGroup {
    /// Stripped name of the member that opened the group
    pub representative_name: String,
    pub folder_name: String,
    pub folder_path: PathBuf,
    /// Never empty; multi-part members are ordered by part number
    pub members: Vec<VideoFile>,
    /// Folder-name extractions, at most one per tier
    pub folder_extractions: Vec<ExtractionResult>,
    /// Folder hints followed by member hints, without duplicates
    pub aggregated_source_hints: Vec<SourceHint>,
    /// File year preferred over folder year
    pub year: Option<i32>,
}

impl VideoGroup {
    pub fn is_multi_part(&self) -> bool {
        self.members.len() > 1
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Non-fatal grouping irregularity, reported for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupAnomaly {
    /// Several open groups were equally similar; the newest one was chosen
    AmbiguousGroup {
        file: PathBuf,
        similarity: f32,
        candidates: usize,
    },
    /// The matching group was full; the file became a singleton
    PartOverflow { file: PathBuf, max_parts: usize },
    /// The matching group already held this part number
    DuplicatePart { file: PathBuf, part_number: u32 },
}

/// Groups plus everything noteworthy that happened while building them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupingReport {
    pub groups: Vec<VideoGroup>,
    pub anomalies: Vec<GroupAnomaly>,
}
