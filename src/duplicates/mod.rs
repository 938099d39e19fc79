//! Identifier-based duplicate reporting
//!
//! Compares two file sets (typically an unsorted library and its organized
//! copy) by the best identifier extracted from each file's folder and stem.
//! Only names are compared; file contents and inodes are never read.

use crate::config::DuplicatesConfig;
use crate::extraction::{ExtractionResult, PatternExtractor};
use crate::grouping::{split_extension, ScannedFile};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Files on both sides sharing one identifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    /// Normalized identifier used for matching
    pub key: String,
    /// Identifier as extracted from the first file of the left side
    pub identifier: String,
    pub confidence: f32,
    pub source: Option<String>,
    pub left: Vec<PathBuf>,
    pub right: Vec<PathBuf>,
}

/// Outcome of comparing two file sets
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DuplicateReport {
    /// Groups ordered by key
    pub groups: Vec<DuplicateGroup>,
    /// Left files without an identifier or without a counterpart
    pub unmatched_left: Vec<PathBuf>,
    pub unmatched_right: Vec<PathBuf>,
}

impl DuplicateReport {
    /// Number of files that belong to some group
    pub fn matched_files(&self) -> usize {
        self.groups
            .iter()
            .map(|g| g.left.len() + g.right.len())
            .sum()
    }
}

/// Files of one side indexed under one key
struct IndexEntry {
    best: ExtractionResult,
    paths: Vec<PathBuf>,
}

/// Matches files across two sets by extracted identifier
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    extractor: PatternExtractor,
    min_confidence: f32,
}

impl DuplicateDetector {
    pub fn new(extractor: PatternExtractor, config: &DuplicatesConfig) -> Self {
        Self {
            extractor,
            min_confidence: config.min_confidence,
        }
    }

    /// Normalized key and best extraction for one file, if confident enough
    pub fn identify(&self, file: &ScannedFile) -> Option<(String, ExtractionResult)> {
        let (stem, _) = split_extension(&file.file_name);
        let text = format!("{} {}", file.folder_name, stem);

        let best = self.extractor.extract(&text).into_iter().next()?;
        if best.confidence < self.min_confidence {
            tracing::debug!(
                file = ?file.path,
                confidence = best.confidence,
                "identifier too weak"
            );
            return None;
        }
        Some((normalize_identifier(&best), best))
    }

    /// Report identifiers present on both sides
    pub fn compare(&self, left: &[ScannedFile], right: &[ScannedFile]) -> DuplicateReport {
        let (left_index, mut unmatched_left) = self.index(left);
        let (mut right_index, mut unmatched_right) = self.index(right);

        let mut groups = Vec::new();
        for (key, entry) in left_index {
            match right_index.remove(&key) {
                Some(other) => groups.push(DuplicateGroup {
                    key,
                    identifier: entry.best.identifier,
                    confidence: entry.best.confidence,
                    source: entry.best.source,
                    left: entry.paths,
                    right: other.paths,
                }),
                None => unmatched_left.extend(entry.paths),
            }
        }
        for entry in right_index.into_values() {
            unmatched_right.extend(entry.paths);
        }

        unmatched_left.sort();
        unmatched_right.sort();
        tracing::info!(groups = groups.len(), "duplicate comparison finished");

        DuplicateReport {
            groups,
            unmatched_left,
            unmatched_right,
        }
    }

    fn index(&self, files: &[ScannedFile]) -> (BTreeMap<String, IndexEntry>, Vec<PathBuf>) {
        let mut index: BTreeMap<String, IndexEntry> = BTreeMap::new();
        let mut unidentified = Vec::new();

        for file in files {
            match self.identify(file) {
                Some((key, best)) => index
                    .entry(key)
                    .or_insert_with(|| IndexEntry {
                        best,
                        paths: Vec::new(),
                    })
                    .paths
                    .push(file.path.clone()),
                None => unidentified.push(file.path.clone()),
            }
        }

        (index, unidentified)
    }
}

/// Uppercase, and drop separators for fc2 identifiers whose spellings vary
pub fn normalize_identifier(result: &ExtractionResult) -> String {
    let upper = result.identifier.to_uppercase();
    match result.source.as_deref() {
        Some("fc2") => upper.chars().filter(|c| *c != '-' && *c != '_').collect(),
        _ => upper,
    }
}
